// Typed access to the blogging backend

mod posts;
pub mod types;

pub use posts::PostService;
pub use types::{
    AutosaveDraft, AutosavePayload, Category, NewPost, Post, PostAuthor, PostPage, PostQuery, Tag,
    TermRef, UpdatePost,
};
