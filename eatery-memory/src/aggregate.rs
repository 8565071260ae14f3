//! Pipeline execution over an in-memory snapshot of a collection.
//!
//! Each stage rewrites the current row set in place. Only the stages the
//! [`Stage`](eatery_core::pipeline::Stage) enum defines are supported.

use std::collections::HashMap;
use bson::{Bson, Document};

use eatery_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    geo::GeoPoint,
    pipeline::{Accumulator, GeoNear, Group, GroupKey, Pipeline, PipelineVisitor},
    query::{Expr, Sort},
};

use crate::evaluator::{DocumentEvaluator, lookup, sort_documents};


pub(crate) struct PipelineRunner {
    rows: Vec<Document>,
}

impl PipelineRunner {
    pub fn new(rows: Vec<Document>) -> Self {
        Self { rows }
    }

    pub fn run(mut self, pipeline: &Pipeline) -> DocumentStoreResult<Vec<Document>> {
        self.visit_pipeline(pipeline)?;
        Ok(self.rows)
    }
}

/// Running state of one accumulator within one group.
#[derive(Debug, Clone)]
enum Running {
    Count(i32),
    Sum { total: f64, all_integers: bool },
    Avg { total: f64, count: usize },
}

impl Running {
    fn start(accumulator: &Accumulator) -> Self {
        match accumulator {
            Accumulator::Count => Running::Count(0),
            Accumulator::Sum(_) => Running::Sum { total: 0.0, all_integers: true },
            Accumulator::Avg(_) => Running::Avg { total: 0.0, count: 0 },
        }
    }

    fn feed(&mut self, accumulator: &Accumulator, row: &Document) {
        let numeric = |field: &str| match lookup(row, field) {
            Some(Bson::Int32(v)) => Some((*v as f64, true)),
            Some(Bson::Int64(v)) => Some((*v as f64, true)),
            Some(Bson::Double(v)) => Some((*v, false)),
            _ => None,
        };

        match (self, accumulator) {
            (Running::Count(n), _) => *n += 1,
            (Running::Sum { total, all_integers }, Accumulator::Sum(field)) => {
                // Non-numeric values are ignored, as the engine's $sum does.
                if let Some((value, integer)) = numeric(field) {
                    *total += value;
                    *all_integers &= integer;
                }
            }
            (Running::Avg { total, count }, Accumulator::Avg(field)) => {
                if let Some((value, _)) = numeric(field) {
                    *total += value;
                    *count += 1;
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> Bson {
        match self {
            Running::Count(n) => Bson::Int32(n),
            Running::Sum { total, all_integers: true } => Bson::Int64(total as i64),
            Running::Sum { total, .. } => Bson::Double(total),
            Running::Avg { count: 0, .. } => Bson::Null,
            Running::Avg { total, count } => Bson::Double(total / count as f64),
        }
    }
}

fn group_key(key: &GroupKey, row: &Document) -> Bson {
    match key {
        GroupKey::Upper(field) => match lookup(row, field) {
            Some(Bson::String(value)) => Bson::String(value.to_uppercase()),
            Some(Bson::Int32(value)) => Bson::String(value.to_string()),
            Some(Bson::Int64(value)) => Bson::String(value.to_string()),
            Some(Bson::Double(value)) => Bson::String(value.to_string()),
            _ => Bson::String(String::new()),
        },
        GroupKey::All => Bson::Null,
    }
}

impl PipelineVisitor for PipelineRunner {
    type Output = ();
    type Error = DocumentStoreError;

    fn visit_geo_near(&mut self, stage: &GeoNear) -> Result<Self::Output, Self::Error> {
        let mut annotated = std::mem::take(&mut self.rows)
            .into_iter()
            .filter_map(|mut row| {
                let point = lookup(&row, &stage.key).and_then(GeoPoint::from_bson)?;
                let distance = stage.near.distance_meters(&point) * stage.distance_multiplier;
                row.insert(stage.distance_field.clone(), distance);
                Some((distance, row))
            })
            .collect::<Vec<_>>();

        annotated.sort_by(|(a, _), (b, _)| a.total_cmp(b));
        self.rows = annotated.into_iter().map(|(_, row)| row).collect();

        Ok(())
    }

    fn visit_match(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        self.rows = DocumentEvaluator::filter_documents(self.rows.iter(), expr)?;
        Ok(())
    }

    fn visit_unwind(&mut self, field: &str) -> Result<Self::Output, Self::Error> {
        self.rows = std::mem::take(&mut self.rows)
            .into_iter()
            .flat_map(|row| {
                let values = match row.get(field) {
                    Some(Bson::Array(items)) => items.clone(),
                    None | Some(Bson::Null) => Vec::new(),
                    Some(other) => vec![other.clone()],
                };

                values.into_iter().map(move |value| {
                    let mut copy = row.clone();
                    copy.insert(field.to_string(), value);
                    copy
                })
            })
            .collect();

        Ok(())
    }

    fn visit_group(&mut self, group: &Group) -> Result<Self::Output, Self::Error> {
        // Groups keep first-seen order; a later $sort decides the output order.
        let mut order: Vec<Bson> = Vec::new();
        let mut groups: HashMap<String, Vec<Running>> = HashMap::new();

        for row in &self.rows {
            let key = group_key(&group.key, row);
            let slot = groups.entry(key.to_string()).or_insert_with(|| {
                order.push(key.clone());
                group.accumulators.iter().map(|(_, acc)| Running::start(acc)).collect()
            });

            for (running, (_, accumulator)) in slot.iter_mut().zip(&group.accumulators) {
                running.feed(accumulator, row);
            }
        }

        self.rows = order
            .into_iter()
            .filter_map(|key| {
                let running = groups.remove(&key.to_string())?;
                let mut out = Document::new();
                out.insert("_id", key);
                for ((name, _), value) in group.accumulators.iter().zip(running) {
                    out.insert(name.clone(), value.finish());
                }
                Some(out)
            })
            .collect();

        Ok(())
    }

    fn visit_sort(&mut self, keys: &[Sort]) -> Result<Self::Output, Self::Error> {
        sort_documents(&mut self.rows, keys);
        Ok(())
    }

    fn visit_project(&mut self, fields: &[String]) -> Result<Self::Output, Self::Error> {
        for row in self.rows.iter_mut() {
            *row = row
                .iter()
                .filter(|(key, _)| fields.iter().any(|field| field == *key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use eatery_core::query::Filter;

    fn rows() -> Vec<Document> {
        vec![
            doc! { "suburb": "Bondi", "cuisine": ["Thai", "Cafe"], "ratingsQuantity": 10_i64, "ratingsAverage": 4.0 },
            doc! { "suburb": "bondi", "cuisine": ["Cafe"], "ratingsQuantity": 5_i64, "ratingsAverage": 5.0 },
            doc! { "suburb": "Manly", "cuisine": ["Thai"], "ratingsQuantity": 30_i64, "ratingsAverage": 3.0 },
        ]
    }

    fn stats(pipeline: Pipeline) -> Vec<Document> {
        PipelineRunner::new(rows()).run(&pipeline).unwrap()
    }

    #[test]
    fn test_group_by_upper_case_key() {
        let out = stats(
            Pipeline::builder()
                .group(
                    GroupKey::upper("suburb"),
                    [
                        ("numRestaurants", Accumulator::Count),
                        ("numRatings", Accumulator::sum("ratingsQuantity")),
                        ("avgRating", Accumulator::avg("ratingsAverage")),
                    ],
                )
                .sort([Sort::desc("numRestaurants")])
                .build(),
        );

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get_str("_id").unwrap(), "BONDI");
        assert_eq!(out[0].get_i32("numRestaurants").unwrap(), 2);
        assert_eq!(out[0].get_i64("numRatings").unwrap(), 15);
        assert_eq!(out[0].get_f64("avgRating").unwrap(), 4.5);
        assert_eq!(out[1].get_str("_id").unwrap(), "MANLY");
    }

    #[test]
    fn test_unwind_emits_row_per_tag() {
        let out = stats(
            Pipeline::builder()
                .unwind("cuisine")
                .group(GroupKey::upper("cuisine"), [("n", Accumulator::Count)])
                .sort([Sort::desc("n"), Sort::asc("_id")])
                .build(),
        );

        let keys: Vec<(&str, i32)> = out
            .iter()
            .map(|d| (d.get_str("_id").unwrap(), d.get_i32("n").unwrap()))
            .collect();
        assert_eq!(keys, vec![("CAFE", 2), ("THAI", 2)]);
    }

    #[test]
    fn test_match_then_group_all() {
        let out = stats(
            Pipeline::builder()
                .filter(Filter::eq("suburb", "Manly"))
                .group(GroupKey::All, [("avg", Accumulator::avg("ratingsAverage"))])
                .build(),
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get_f64("avg").unwrap(), 3.0);
    }

    #[test]
    fn test_geo_near_must_come_first() {
        let pipeline = Pipeline::builder()
            .project(["name"])
            .geo_near("location", GeoPoint::new(0.0, 0.0), "distance", 1.0)
            .build();

        assert!(PipelineRunner::new(rows()).run(&pipeline).is_err());
    }
}
