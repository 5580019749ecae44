// Post CRUD, publishing, and server-side draft snapshots

use crate::api::types::{
    AutosaveDraft, AutosaveEnvelope, AutosavePayload, CategoriesEnvelope, Category, NewPost, Post,
    PostEnvelope, PostPage, PostQuery, PublishEnvelope, Tag, TagsEnvelope, UpdatePost,
};
use crate::client::ScribeClient;
use crate::error::Result;

/// High-level interface to the posts and taxonomy endpoints
///
/// All calls go through the coordinating client, so expired access
/// tokens are refreshed and replayed transparently.
#[derive(Clone)]
pub struct PostService {
    client: ScribeClient,
}

impl PostService {
    pub fn new(client: ScribeClient) -> Self {
        Self { client }
    }

    /// List posts, filtered and paginated
    pub async fn list(&self, query: &PostQuery) -> Result<PostPage> {
        self.client
            .send_json(self.client.get("/posts").query(query))
            .await
    }

    /// Fetch a single post by slug, including its content
    pub async fn get(&self, slug: &str) -> Result<Post> {
        let envelope: PostEnvelope = self
            .client
            .send_json(self.client.get(&format!("/posts/{}", slug)))
            .await?;
        Ok(envelope.post)
    }

    /// Fetch a single post by id, the form the editor works with
    pub async fn get_by_id(&self, id: i64) -> Result<Post> {
        let envelope: PostEnvelope = self
            .client
            .send_json(self.client.get(&format!("/posts/by-id/{}", id)))
            .await?;
        Ok(envelope.post)
    }

    /// Create a post; drafts unless `status` says otherwise
    pub async fn create(&self, post: &NewPost) -> Result<Post> {
        let envelope: PostEnvelope = self
            .client
            .send_json(self.client.post("/posts").json(post))
            .await?;
        tracing::info!(id = envelope.post.id, slug = %envelope.post.slug, "Post created");
        Ok(envelope.post)
    }

    /// Apply a partial update to an existing post
    pub async fn update(&self, id: i64, changes: &UpdatePost) -> Result<Post> {
        let envelope: PostEnvelope = self
            .client
            .send_json(self.client.put(&format!("/posts/{}", id)).json(changes))
            .await?;
        Ok(envelope.post)
    }

    /// Delete a post
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.client
            .send(self.client.delete(&format!("/posts/{}", id)))
            .await?;
        tracing::info!(id, "Post deleted");
        Ok(())
    }

    /// Publish a draft
    ///
    /// Returns the updated post, or `None` when it was already
    /// published and the backend had nothing to change.
    pub async fn publish(&self, id: i64) -> Result<Option<Post>> {
        let envelope: PublishEnvelope = self
            .client
            .send_json(self.client.post(&format!("/posts/{}/publish", id)))
            .await?;
        Ok(envelope.post)
    }

    /// Write a draft snapshot for a post
    pub async fn autosave(&self, post_id: i64, draft: &AutosavePayload) -> Result<AutosaveDraft> {
        let envelope: AutosaveEnvelope = self
            .client
            .send_json(
                self.client
                    .post(&format!("/posts/{}/autosave", post_id))
                    .json(draft),
            )
            .await?;
        Ok(envelope.autosave)
    }

    /// Fetch the draft snapshot for a post, if one exists
    pub async fn get_autosave(&self, post_id: i64) -> Result<Option<AutosaveDraft>> {
        let result: Result<AutosaveEnvelope> = self
            .client
            .send_json(self.client.get(&format!("/posts/{}/autosave", post_id)))
            .await;
        match result {
            Ok(envelope) => Ok(Some(envelope.autosave)),
            Err(e) if e.status() == Some(404) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// All categories, ordered by name
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let envelope: CategoriesEnvelope = self
            .client
            .send_json(self.client.get("/categories"))
            .await?;
        Ok(envelope.categories)
    }

    /// All tags, ordered by name
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let envelope: TagsEnvelope = self.client.send_json(self.client.get("/tags")).await?;
        Ok(envelope.tags)
    }
}
