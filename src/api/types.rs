// Wire types for the posts API
//
// Shapes mirror the backend's JSON payloads. Timestamps arrive as naive
// ISO-8601 strings without a timezone suffix, hence NaiveDateTime.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Author summary embedded in post payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostAuthor {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
}

/// Category or tag reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermRef {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Category as returned by the taxonomy listing endpoints
///
/// Posts embed the slimmer [`TermRef`]; listings add usage counts.
#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    #[serde(default)]
    pub post_count: i64,
    pub created_at: Option<NaiveDateTime>,
}

/// Tag as returned by the taxonomy listing endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub post_count: i64,
    pub created_at: Option<NaiveDateTime>,
}

/// A blog post as returned by the backend
///
/// List endpoints omit `content`; detail endpoints include it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub featured_image_url: Option<String>,
    pub author: Option<PostAuthor>,
    pub status: String,
    #[serde(default)]
    pub view_count: i64,
    pub published_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub categories: Vec<TermRef>,
    #[serde(default)]
    pub tags: Vec<TermRef>,
    #[serde(default)]
    pub content: Option<String>,
}

/// One page of a post listing
#[derive(Debug, Clone, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
    pub per_page: i64,
}

/// Filters for the post listing endpoint
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

/// Payload for creating a post
#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl NewPost {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            excerpt: None,
            featured_image_url: None,
            category_ids: None,
            tag_ids: None,
            status: None,
        }
    }
}

/// Partial update for an existing post
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdatePost {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Server-side draft snapshot written by the autosave endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AutosaveDraft {
    pub id: i64,
    pub post_id: i64,
    pub title: Option<String>,
    pub content: String,
    pub saved_at: Option<NaiveDateTime>,
}

/// Body sent to the autosave endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AutosavePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostEnvelope {
    pub post: Post,
}

/// Publish returns the post body only on an actual state change
#[derive(Debug, Deserialize)]
pub(crate) struct PublishEnvelope {
    #[serde(default)]
    pub post: Option<Post>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AutosaveEnvelope {
    pub autosave: AutosaveDraft,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoriesEnvelope {
    pub categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagsEnvelope {
    pub tags: Vec<Tag>,
}
