//! Product categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, Entity, ValidationError};
use crate::types::{CategoryId, slugify};

/// A product category. Categories may nest one level under a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CategoryId>,
    /// Position in menus, lower first.
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Entity for Category {
    type Id = CategoryId;
    const COLLECTION: Collection = Collection::Categories;

    fn id(&self) -> CategoryId {
        self.id
    }

    fn set_id(&mut self, id: CategoryId) {
        self.id = id;
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.slug.clone())
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_owned();
        self.slug = if self.slug.trim().is_empty() {
            slugify(&self.name)
        } else {
            slugify(&self.slug)
        };
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::new("category name is required"));
        }
        if self.slug.is_empty() {
            return Err(ValidationError::new("category slug is empty"));
        }
        if self.parent_id == Some(self.id) {
            return Err(ValidationError::new("a category cannot be its own parent"));
        }
        Ok(())
    }
}

/// Sort categories for display: by `sort_order`, then name.
pub fn sort_for_display(categories: &mut [Category]) {
    categories.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_self_parent_rejected() {
        let mut c: Category =
            serde_json::from_value(json!({ "id": 2, "name": "Pots", "parentId": 2 })).unwrap();
        c.normalize();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_sort_for_display() {
        let mut list: Vec<Category> = serde_json::from_value(json!([
            { "id": 1, "name": "Knives", "sortOrder": 2 },
            { "id": 2, "name": "Pans", "sortOrder": 1 },
            { "id": 3, "name": "Bowls", "sortOrder": 2 },
        ]))
        .unwrap();
        sort_for_display(&mut list);
        let names: Vec<_> = list.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Pans", "Bowls", "Knives"]);
    }
}
