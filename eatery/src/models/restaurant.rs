use bson::Bson;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use eatery_core::{document::Document, geo::GeoPoint};

use crate::{
    error::{ApiError, ApiResult},
    models::{Violations, review::ReviewSummary, timestamp, uuid_str},
};

pub const DEFAULT_RATING: f64 = 4.5;
const MAX_NAME_LENGTH: usize = 80;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointKind {
    #[default]
    Point,
}

/// A GeoJSON point with an optional street address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Location {
    #[serde(rename = "type", default)]
    pub kind: PointKind,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    pub fn new(point: GeoPoint) -> Self {
        Self {
            kind: PointKind::Point,
            coordinates: point.coordinates(),
            address: None,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.coordinates[0], self.coordinates[1])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    #[serde(with = "uuid_str")]
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub suburb: String,
    pub cuisine: Vec<String>,
    pub location: Location,
    pub ratings_average: f64,
    pub ratings_quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "uuid_str::option")]
    pub owner: Option<Uuid>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Document for Restaurant {
    fn id(&self) -> Uuid {
        self.id
    }

    fn collection_name() -> &'static str {
        "restaurants"
    }
}

/// A restaurant together with its reviews, as returned by the detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RestaurantDetail {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub reviews: Vec<ReviewSummary>,
}

/// Body of `POST /api/restaurants`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRestaurant {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub suburb: String,
    pub cuisine: Vec<String>,
    pub location: Location,
    #[serde(default)]
    pub ratings_average: Option<f64>,
    #[serde(default)]
    pub ratings_quantity: Option<i64>,
    #[serde(default)]
    pub owner: Option<Uuid>,
}

impl NewRestaurant {
    pub fn validate(&self) -> ApiResult<()> {
        let mut violations = Violations::default();

        check_name(&mut violations, &self.name);
        check_suburb(&mut violations, &self.suburb);
        check_cuisine(&mut violations, &self.cuisine);
        check_location(&mut violations, &self.location);
        if let Some(rating) = self.ratings_average {
            check_rating(&mut violations, rating);
        }
        if let Some(quantity) = self.ratings_quantity {
            check_quantity(&mut violations, quantity);
        }

        violations.into_result()
    }

    /// Builds the stored document; `owner` falls back to `creator`.
    pub fn into_restaurant(self, creator: Uuid) -> Restaurant {
        Restaurant {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            description: self.description,
            suburb: self.suburb.trim().to_string(),
            cuisine: self.cuisine,
            location: self.location,
            ratings_average: round_rating(self.ratings_average.unwrap_or(DEFAULT_RATING)),
            ratings_quantity: self.ratings_quantity.unwrap_or(0),
            owner: Some(self.owner.unwrap_or(creator)),
            created_at: Utc::now().trunc_subsecs(3),
        }
    }
}

/// Body of `PATCH /api/restaurants/{id}`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RestaurantPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suburb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings_average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings_quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "uuid_str::option")]
    pub owner: Option<Uuid>,
}

impl RestaurantPatch {
    pub fn validate(&self) -> ApiResult<()> {
        let mut violations = Violations::default();

        if let Some(name) = &self.name {
            check_name(&mut violations, name);
        }
        if let Some(suburb) = &self.suburb {
            check_suburb(&mut violations, suburb);
        }
        if let Some(cuisine) = &self.cuisine {
            check_cuisine(&mut violations, cuisine);
        }
        if let Some(location) = &self.location {
            check_location(&mut violations, location);
        }
        if let Some(rating) = self.ratings_average {
            check_rating(&mut violations, rating);
        }
        if let Some(quantity) = self.ratings_quantity {
            check_quantity(&mut violations, quantity);
        }

        violations.into_result()
    }

    /// The `$set` document for this patch. Empty when nothing changes.
    pub fn into_changes(mut self) -> ApiResult<bson::Document> {
        self.name = self.name.map(|name| name.trim().to_string());
        self.suburb = self.suburb.map(|suburb| suburb.trim().to_string());
        self.ratings_average = self.ratings_average.map(round_rating);

        match bson::ser::serialize_to_bson(&self) {
            Ok(Bson::Document(changes)) => Ok(changes),
            Ok(other) => Err(ApiError::Internal(format!("patch serialized to {:?}", other.element_type()))),
            Err(err) => Err(ApiError::Internal(err.to_string())),
        }
    }
}

/// One row of `stats-by-suburb` / `stats-by-cuisine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    #[serde(rename = "_id")]
    pub id: String,
    pub num_restaurants: i64,
    pub num_ratings: i64,
    pub avg_rating: Option<f64>,
}

/// One row of `distances-from`, in the requested unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceRow {
    #[serde(with = "uuid_str")]
    pub id: Uuid,
    pub name: String,
    pub distance: f64,
}

pub fn round_rating(rating: f64) -> f64 {
    (rating * 10.0).round() / 10.0
}

fn check_name(violations: &mut Violations, name: &str) {
    let name = name.trim();
    violations.check(!name.is_empty(), "A restaurant must have a name");
    violations.check(
        name.chars().count() <= MAX_NAME_LENGTH,
        format!("A restaurant name must have at most {MAX_NAME_LENGTH} characters"),
    );
}

fn check_suburb(violations: &mut Violations, suburb: &str) {
    violations.check(!suburb.trim().is_empty(), "A restaurant must have a suburb");
}

fn check_cuisine(violations: &mut Violations, cuisine: &[String]) {
    violations.check(!cuisine.is_empty(), "A restaurant must have at least one cuisine");
    violations.check(
        cuisine.iter().all(|tag| !tag.trim().is_empty()),
        "Cuisine tags must not be empty",
    );
}

fn check_location(violations: &mut Violations, location: &Location) {
    let [lng, lat] = location.coordinates;
    violations.check(
        (-180.0..=180.0).contains(&lng) && (-90.0..=90.0).contains(&lat),
        "Location coordinates must be [lng, lat] within [-180, 180] and [-90, 90]",
    );
}

fn check_rating(violations: &mut Violations, rating: f64) {
    violations.check((1.0..=5.0).contains(&rating), "Rating must be between 1.0 and 5.0");
}

fn check_quantity(violations: &mut Violations, quantity: i64) {
    violations.check(quantity >= 0, "Ratings quantity must not be negative");
}

#[cfg(test)]
mod tests {
    use super::*;
    use eatery_core::document::DocumentExt;
    use serde_json::json;

    fn new_restaurant() -> serde_json::Value {
        json!({
            "name": "Icebergs",
            "suburb": "Bondi",
            "cuisine": ["Italian"],
            "location": { "type": "Point", "coordinates": [151.2743, -33.8915] },
        })
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let mut body = new_restaurant();
        body["michelinStars"] = json!(3);

        assert!(serde_json::from_value::<NewRestaurant>(body).is_err());
    }

    #[test]
    fn test_defaults_and_owner() {
        let creator = Uuid::new_v4();
        let restaurant = serde_json::from_value::<NewRestaurant>(new_restaurant())
            .unwrap()
            .into_restaurant(creator);

        assert_eq!(restaurant.ratings_average, DEFAULT_RATING);
        assert_eq!(restaurant.ratings_quantity, 0);
        assert_eq!(restaurant.owner, Some(creator));
    }

    #[test]
    fn test_validation_collects_violations() {
        let mut body = new_restaurant();
        body["name"] = json!("  ");
        body["cuisine"] = json!([]);
        body["ratingsAverage"] = json!(7.0);
        let new = serde_json::from_value::<NewRestaurant>(body).unwrap();

        match new.validate() {
            Err(ApiError::Validation(message)) => {
                assert!(message.contains("name"));
                assert!(message.contains("cuisine"));
                assert!(message.contains("Rating"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_ids_and_timestamps_are_stored_as_strings() {
        let restaurant = serde_json::from_value::<NewRestaurant>(new_restaurant())
            .unwrap()
            .into_restaurant(Uuid::new_v4());

        let stored = restaurant.to_bson().unwrap();
        let stored = stored.as_document().unwrap();
        assert_eq!(stored.get_str("id").unwrap(), restaurant.id.to_string());
        assert!(stored.get_str("createdAt").unwrap().ends_with('Z'));

        assert_eq!(Restaurant::from_bson(Bson::Document(stored.clone())).unwrap(), restaurant);
    }

    #[test]
    fn test_patch_changes() {
        let patch: RestaurantPatch =
            serde_json::from_value(json!({ "name": " Bills ", "ratingsAverage": 4.26 })).unwrap();
        patch.validate().unwrap();

        let changes = patch.into_changes().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.get_str("name").unwrap(), "Bills");
        assert_eq!(changes.get_f64("ratingsAverage").unwrap(), 4.3);

        assert!(RestaurantPatch::default().into_changes().unwrap().is_empty());
        assert!(serde_json::from_value::<RestaurantPatch>(json!({ "id": "x" })).is_err());
    }
}
