//! Core traits for document representation and serialization.
//!
//! Every stored type implements [`Document`]; [`DocumentExt`] is blanket-implemented
//! on top of it and converts documents to and from BSON.

use bson::{Bson, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};
use serde_json::{Value, to_value};
use uuid::Uuid;

use crate::error::DocumentStoreResult;

/// Core trait that all documents stored in a document store must implement.
///
/// A document carries a UUID identifier and names the collection it lives in.
///
/// # Example
///
/// ```ignore
/// use eatery_core::document::Document;
/// use uuid::Uuid;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Dish {
///     pub id: Uuid,
///     pub name: String,
/// }
///
/// impl Document for Dish {
///     fn id(&self) -> Uuid {
///         self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "dishes"
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns this document's unique identifier.
    fn id(&self) -> Uuid;

    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;
}

/// Extension trait providing serialization utilities for documents.
///
/// Automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value for storage.
    fn to_bson(&self) -> DocumentStoreResult<Bson>;

    /// Creates a document from a BSON value.
    fn from_bson(bson: Bson) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> DocumentStoreResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }
}

/// Converts a raw BSON document (for example a projected query row or an
/// aggregation result) into plain JSON.
pub fn bson_to_json(bson: Bson) -> DocumentStoreResult<Value> {
    Ok(to_value(bson)?)
}

/// Deserializes a raw BSON value into any deserializable shape.
pub fn bson_into<T: for<'de> Deserialize<'de>>(bson: Bson) -> DocumentStoreResult<T> {
    Ok(deserialize_from_bson(bson)?)
}
