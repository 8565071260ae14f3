//! Declarative aggregation pipelines.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s handed to a backend, which
//! executes it natively. Backends walk the stages with a [`PipelineVisitor`],
//! the same way filters are walked with a
//! [`QueryVisitor`](crate::query::QueryVisitor).
//!
//! ```ignore
//! use eatery_core::pipeline::{Pipeline, GroupKey, Accumulator};
//! use eatery_core::query::Sort;
//!
//! let pipeline = Pipeline::builder()
//!     .unwind("cuisine")
//!     .group(
//!         GroupKey::upper("cuisine"),
//!         [
//!             ("numRestaurants", Accumulator::Count),
//!             ("avgRating", Accumulator::avg("ratingsAverage")),
//!         ],
//!     )
//!     .sort([Sort::desc("numRestaurants")])
//!     .build();
//! ```

use crate::{
    error::DocumentStoreError,
    geo::GeoPoint,
    query::{Expr, Sort},
};

/// Annotates each document with its distance from a point, nearest first.
///
/// Must be the first stage of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoNear {
    /// Reference point.
    pub near: GeoPoint,
    /// Field holding the indexed GeoJSON point.
    pub key: String,
    /// Output field receiving the distance.
    pub distance_field: String,
    /// Factor applied to the distance in meters.
    pub distance_multiplier: f64,
}

/// The grouping key of a [`Stage::Group`].
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    /// Group by the upper-cased string value of a field.
    Upper(String),
    /// Collapse every document into a single group.
    All,
}

impl GroupKey {
    pub fn upper(field: impl Into<String>) -> Self {
        GroupKey::Upper(field.into())
    }
}

/// Per-group accumulators.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Number of documents in the group.
    Count,
    /// Sum of a numeric field.
    Sum(String),
    /// Mean of a numeric field.
    Avg(String),
}

impl Accumulator {
    pub fn sum(field: impl Into<String>) -> Self {
        Accumulator::Sum(field.into())
    }

    pub fn avg(field: impl Into<String>) -> Self {
        Accumulator::Avg(field.into())
    }
}

/// A grouping stage. The group key is written to `_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: GroupKey,
    pub accumulators: Vec<(String, Accumulator)>,
}

/// One step of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    GeoNear(GeoNear),
    Match(Expr),
    /// Emits one document per element of an array field.
    Unwind(String),
    Group(Group),
    Sort(Vec<Sort>),
    /// Keeps only the listed fields.
    Project(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
}

impl PipelineBuilder {
    pub fn geo_near(
        mut self,
        key: impl Into<String>,
        near: GeoPoint,
        distance_field: impl Into<String>,
        distance_multiplier: f64,
    ) -> Self {
        self.stages.push(Stage::GeoNear(GeoNear {
            near,
            key: key.into(),
            distance_field: distance_field.into(),
            distance_multiplier,
        }));
        self
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.stages.push(Stage::Match(expr));
        self
    }

    pub fn unwind(mut self, field: impl Into<String>) -> Self {
        self.stages.push(Stage::Unwind(field.into()));
        self
    }

    pub fn group<N: Into<String>>(
        mut self,
        key: GroupKey,
        accumulators: impl IntoIterator<Item = (N, Accumulator)>,
    ) -> Self {
        self.stages.push(Stage::Group(Group {
            key,
            accumulators: accumulators
                .into_iter()
                .map(|(name, acc)| (name.into(), acc))
                .collect(),
        }));
        self
    }

    pub fn sort(mut self, keys: impl IntoIterator<Item = Sort>) -> Self {
        self.stages.push(Stage::Sort(keys.into_iter().collect()));
        self
    }

    pub fn project<F: Into<String>>(mut self, fields: impl IntoIterator<Item = F>) -> Self {
        self.stages.push(Stage::Project(fields.into_iter().map(Into::into).collect()));
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline { stages: self.stages }
    }
}

/// Walks pipeline stages. Implemented by each backend.
pub trait PipelineVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_geo_near(&mut self, stage: &GeoNear) -> Result<Self::Output, Self::Error>;
    fn visit_match(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_unwind(&mut self, field: &str) -> Result<Self::Output, Self::Error>;
    fn visit_group(&mut self, group: &Group) -> Result<Self::Output, Self::Error>;
    fn visit_sort(&mut self, keys: &[Sort]) -> Result<Self::Output, Self::Error>;
    fn visit_project(&mut self, fields: &[String]) -> Result<Self::Output, Self::Error>;

    fn visit_stage(&mut self, stage: &Stage) -> Result<Self::Output, Self::Error> {
        match stage {
            Stage::GeoNear(geo) => self.visit_geo_near(geo),
            Stage::Match(expr) => self.visit_match(expr),
            Stage::Unwind(field) => self.visit_unwind(field),
            Stage::Group(group) => self.visit_group(group),
            Stage::Sort(keys) => self.visit_sort(keys),
            Stage::Project(fields) => self.visit_project(fields),
        }
    }

    /// Visits every stage in order, rejecting a `$geoNear` that is not first.
    fn visit_pipeline(&mut self, pipeline: &Pipeline) -> Result<Vec<Self::Output>, DocumentStoreError> {
        pipeline
            .stages
            .iter()
            .enumerate()
            .map(|(index, stage)| {
                if index > 0 && matches!(stage, Stage::GeoNear(_)) {
                    return Err(DocumentStoreError::InvalidQuery(
                        "$geoNear is only valid as the first stage of a pipeline".to_string(),
                    ));
                }
                self.visit_stage(stage).map_err(Into::into)
            })
            .collect()
    }
}
