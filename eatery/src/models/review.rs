use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use eatery_core::document::Document;

use crate::{
    error::ApiResult,
    models::{Violations, timestamp, uuid_str},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(with = "uuid_str")]
    pub id: Uuid,
    pub review: String,
    pub rating: i32,
    #[serde(with = "uuid_str")]
    pub restaurant: Uuid,
    #[serde(with = "uuid_str")]
    pub user: Uuid,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Document for Review {
    fn id(&self) -> Uuid {
        self.id
    }

    fn collection_name() -> &'static str {
        "reviews"
    }
}

/// The fields of a review embedded in a restaurant's detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    #[serde(with = "uuid_str")]
    pub id: Uuid,
    pub rating: i32,
    pub review: String,
}

impl ReviewSummary {
    pub const FIELDS: [&'static str; 3] = ["id", "rating", "review"];
}

/// Body of `POST /api/restaurants/{id}/reviews`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewReview {
    pub review: String,
    pub rating: i32,
}

impl NewReview {
    pub fn validate(&self) -> ApiResult<()> {
        let mut violations = Violations::default();
        violations.check(!self.review.trim().is_empty(), "Review can not be empty");
        violations.check((1..=5).contains(&self.rating), "Rating must be between 1 and 5");
        violations.into_result()
    }

    pub fn into_review(self, restaurant: Uuid, user: Uuid) -> Review {
        Review {
            id: Uuid::new_v4(),
            review: self.review.trim().to_string(),
            rating: self.rating,
            restaurant,
            user,
            created_at: Utc::now().trunc_subsecs(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_review_validation() {
        let ok: NewReview = serde_json::from_value(json!({ "review": "Great pasta", "rating": 5 })).unwrap();
        assert!(ok.validate().is_ok());

        let bad: NewReview = serde_json::from_value(json!({ "review": " ", "rating": 0 })).unwrap();
        assert!(bad.validate().is_err());

        assert!(serde_json::from_value::<NewReview>(json!({ "review": "x", "rating": 3, "user": "me" })).is_err());
    }
}
