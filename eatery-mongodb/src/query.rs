//! Query translation from the eatery query AST to MongoDB query syntax.
//!
//! This module translates abstract query expressions into MongoDB BSON
//! documents for execution by the MongoDB query engine.

use bson::{Bson, Document, doc};

use eatery_core::{
    error::DocumentStoreError,
    geo::GeoPoint,
    query::{Expr, FieldOp, QueryVisitor},
};


/// Translates query expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::AnyOf => match value {
                    Bson::Array(_) => doc! { "$in": value },
                    _ => doc! { "$in": [value] },
                },
            }
        })
    }

    fn visit_geo_within_sphere(
        &mut self,
        field: &str,
        center: &GeoPoint,
        radius: f64,
    ) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: {
                "$geoWithin": {
                    "$centerSphere": [[center.lng, center.lat], radius],
                },
            },
        })
    }
}
