//! Pipeline translation from the eatery pipeline AST to MongoDB aggregation stages.

use bson::{Bson, Document, doc};

use eatery_core::{
    error::DocumentStoreError,
    pipeline::{Accumulator, GeoNear, Group, GroupKey, PipelineVisitor},
    query::{Expr, QueryVisitor, Sort},
};

use crate::query::MongoQueryTranslator;


/// Translates each pipeline stage into one MongoDB stage document.
pub(crate) struct MongoPipelineTranslator;

pub(crate) fn sort_document(keys: &[Sort]) -> Document {
    keys.iter()
        .map(|key| (key.field.clone(), Bson::Int32(key.direction.as_i32())))
        .collect()
}

impl PipelineVisitor for MongoPipelineTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_geo_near(&mut self, stage: &GeoNear) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$geoNear": {
                "near": stage.near.to_geojson(),
                "key": &stage.key,
                "distanceField": &stage.distance_field,
                "distanceMultiplier": stage.distance_multiplier,
                "spherical": true,
            }
        })
    }

    fn visit_match(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$match": MongoQueryTranslator.visit_expr(expr)? })
    }

    fn visit_unwind(&mut self, field: &str) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$unwind": format!("${field}") })
    }

    fn visit_group(&mut self, group: &Group) -> Result<Self::Output, Self::Error> {
        let mut stage = doc! {
            "_id": match &group.key {
                GroupKey::Upper(field) => Bson::Document(doc! { "$toUpper": format!("${field}") }),
                GroupKey::All => Bson::Null,
            }
        };

        for (name, accumulator) in &group.accumulators {
            stage.insert(
                name.clone(),
                match accumulator {
                    Accumulator::Count => doc! { "$sum": 1 },
                    Accumulator::Sum(field) => doc! { "$sum": format!("${field}") },
                    Accumulator::Avg(field) => doc! { "$avg": format!("${field}") },
                },
            );
        }

        Ok(doc! { "$group": stage })
    }

    fn visit_sort(&mut self, keys: &[Sort]) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$sort": sort_document(keys) })
    }

    fn visit_project(&mut self, fields: &[String]) -> Result<Self::Output, Self::Error> {
        let mut projection = Document::new();
        if !fields.iter().any(|f| f == "_id") {
            projection.insert("_id", 0);
        }
        for field in fields {
            projection.insert(field.clone(), 1);
        }

        Ok(doc! { "$project": projection })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eatery_core::{geo::GeoPoint, pipeline::Pipeline};

    #[test]
    fn test_cuisine_stats_pipeline() {
        let pipeline = Pipeline::builder()
            .unwind("cuisine")
            .group(
                GroupKey::upper("cuisine"),
                [
                    ("numRestaurants", Accumulator::Count),
                    ("numRatings", Accumulator::sum("ratingsQuantity")),
                    ("avgRating", Accumulator::avg("ratingsAverage")),
                ],
            )
            .sort([Sort::desc("numRestaurants"), Sort::desc("numRatings"), Sort::desc("avgRating")])
            .build();

        let stages = MongoPipelineTranslator.visit_pipeline(&pipeline).unwrap();

        assert_eq!(
            stages,
            vec![
                doc! { "$unwind": "$cuisine" },
                doc! { "$group": {
                    "_id": { "$toUpper": "$cuisine" },
                    "numRestaurants": { "$sum": 1 },
                    "numRatings": { "$sum": "$ratingsQuantity" },
                    "avgRating": { "$avg": "$ratingsAverage" },
                } },
                doc! { "$sort": { "numRestaurants": -1, "numRatings": -1, "avgRating": -1 } },
            ]
        );
    }

    #[test]
    fn test_geo_near_stage() {
        let pipeline = Pipeline::builder()
            .geo_near("location", GeoPoint::new(151.2, -33.9), "distance", 0.001)
            .project(["id", "name", "distance"])
            .build();

        let stages = MongoPipelineTranslator.visit_pipeline(&pipeline).unwrap();

        assert_eq!(
            stages[0],
            doc! { "$geoNear": {
                "near": { "type": "Point", "coordinates": [151.2, -33.9] },
                "key": "location",
                "distanceField": "distance",
                "distanceMultiplier": 0.001,
                "spherical": true,
            } }
        );
        assert_eq!(stages[1], doc! { "$project": { "_id": 0, "id": 1, "name": 1, "distance": 1 } });
    }
}
