//! Blog posts (recipes, buying guides).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, Entity, ValidationError};
use crate::types::{BlogPostId, slugify};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: BlogPostId,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
    /// Set the first time the post is published and kept afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Entity for BlogPost {
    type Id = BlogPostId;
    const COLLECTION: Collection = Collection::BlogPosts;

    fn id(&self) -> BlogPostId {
        self.id
    }

    fn set_id(&mut self, id: BlogPostId) {
        self.id = id;
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.slug.clone())
    }

    fn normalize(&mut self) {
        self.title = self.title.trim().to_owned();
        self.slug = if self.slug.trim().is_empty() {
            slugify(&self.title)
        } else {
            slugify(&self.slug)
        };
        if self.published && self.published_at.is_none() {
            self.published_at = Some(self.updated_at);
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.is_empty() {
            return Err(ValidationError::new("post title is required"));
        }
        if self.slug.is_empty() {
            return Err(ValidationError::new("post slug is empty"));
        }
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        if self.published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
    }
}
