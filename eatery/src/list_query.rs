//! Translation of list query strings into store queries.
//!
//! ```text
//! ?suburb=Bondi&ratingsAverage[gte]=4&cuisine[in]=Thai,Lao&sort=-ratingsAverage,name&fields=name,suburb&page=2&limit=10
//! ```
//!
//! Reserved keys (`page`, `limit`, `sort`, `fields`) shape the result; every
//! other key is a filter. Values are typed before comparison: integers, then
//! floats, then `true`/`false`, otherwise strings. Field names may be dotted
//! paths into embedded documents (`location.coordinates`) but no segment may
//! start with `$`.

use axum::{
    extract::{FromRequestParts, Query as QueryString},
    http::request::Parts,
};
use bson::Bson;

use eatery_core::{
    page::PaginationParams,
    query::{Expr, Filter, Projection, Query, Sort},
};

use crate::error::ApiError;

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 1000;

/// Largest number of skipped documents a page may imply; stores count skips as `i64`.
const MAX_OFFSET: usize = i64::MAX as usize;

const RESERVED: [&str; 4] = ["page", "limit", "sort", "fields"];

/// A fully translated list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filter: Option<Expr>,
    pub sort: Vec<Sort>,
    pub projection: Option<Projection>,
    pub pagination: PaginationParams,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: None,
            sort: vec![Sort::desc("createdAt")],
            projection: None,
            pagination: PaginationParams::new(1, DEFAULT_LIMIT),
        }
    }
}

impl ListQuery {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self, ApiError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut list = ListQuery::default();
        let mut conditions = Vec::new();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());

            match key {
                "page" => list.pagination.page = parse_positive("page", value)?,
                "limit" => list.pagination.per_page = parse_positive("limit", value)?.min(MAX_LIMIT),
                "sort" => list.sort = parse_sort(value)?,
                "fields" => list.projection = parse_fields(value)?,
                _ => conditions.push(parse_condition(key, value)?),
            }
        }

        if list.pagination.checked_offset().is_none_or(|offset| offset > MAX_OFFSET) {
            return Err(ApiError::BadRequest(format!(
                "Invalid page: {} is out of range",
                list.pagination.page
            )));
        }

        list.filter = match conditions.len() {
            0 => None,
            1 => conditions.pop(),
            _ => Some(Filter::and(conditions)),
        };

        Ok(list)
    }

    /// The store query for the requested page.
    pub fn to_query(&self) -> Query {
        let mut builder = Query::builder()
            .maybe_filter(self.filter.clone())
            .offset(self.pagination.offset())
            .limit(self.pagination.per_page);

        for sort in &self.sort {
            builder = builder.sort(sort.field.clone(), sort.direction);
        }
        if let Some(projection) = &self.projection {
            builder = builder.project(projection.clone());
        }

        builder.build()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ListQuery {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let QueryString(pairs) = QueryString::<Vec<(String, String)>>::try_from_uri(&parts.uri)?;
        ListQuery::from_pairs(pairs)
    }
}

fn parse_positive(key: &str, value: &str) -> Result<usize, ApiError> {
    value
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {key}: {value:?} is not a positive integer")))
}

/// A usable field path: non-empty segments, none of them an operator.
fn is_field_path(field: &str) -> bool {
    !field.is_empty()
        && field
            .split('.')
            .all(|segment| !segment.is_empty() && !segment.starts_with('$'))
}

fn parse_sort(value: &str) -> Result<Vec<Sort>, ApiError> {
    let mut sort = Vec::new();

    for field in value.split(',').map(str::trim).filter(|f| !f.is_empty() && *f != "-") {
        let (name, descending) = match field.strip_prefix('-') {
            Some(name) => (name, true),
            None => (field, false),
        };

        if !is_field_path(name) {
            return Err(ApiError::BadRequest(format!("Invalid sort field {name:?}")));
        }

        sort.push(if descending { Sort::desc(name) } else { Sort::asc(name) });
    }

    Ok(if sort.is_empty() { ListQuery::default().sort } else { sort })
}

fn parse_fields(value: &str) -> Result<Option<Projection>, ApiError> {
    let fields: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .collect();

    if fields.is_empty() {
        return Ok(None);
    }

    let names: Vec<&str> = fields.iter().map(|f| f.trim_start_matches('-')).collect();

    if let Some(bad) = names.iter().find(|name| !is_field_path(name)) {
        return Err(ApiError::BadRequest(format!("Invalid field {bad:?}")));
    }

    for name in &names {
        if let Some(nested) = names.iter().find(|other| {
            other.strip_prefix(*name).is_some_and(|rest| rest.starts_with('.'))
        }) {
            return Err(ApiError::BadRequest(format!(
                "Field {nested:?} collides with {name:?}"
            )));
        }
    }

    let excluded = fields.iter().filter(|f| f.starts_with('-')).count();

    if excluded == fields.len() {
        Ok(Some(Projection::Exclude(names.iter().map(|f| f.to_string()).collect())))
    } else if excluded == 0 {
        let mut include: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        if !include.iter().any(|f| f == "id") {
            include.push("id".to_string());
        }
        Ok(Some(Projection::Include(include)))
    } else {
        Err(ApiError::BadRequest("Cannot mix included and excluded fields".to_string()))
    }
}

/// Parses `field=value` or `field[op]=value` into a filter expression.
fn parse_condition(key: &str, value: &str) -> Result<Expr, ApiError> {
    let (field, op) = match key.split_once('[') {
        Some((field, rest)) => {
            let op = rest
                .strip_suffix(']')
                .ok_or_else(|| ApiError::BadRequest(format!("Malformed filter key {key:?}")))?;
            (field, Some(op))
        }
        None => (key, None),
    };

    if !is_field_path(field) || RESERVED.contains(&field) {
        return Err(ApiError::BadRequest(format!("Invalid filter field {field:?}")));
    }

    Ok(match op {
        None => Filter::eq(field, typed_value(value)),
        Some("gte") => Filter::gte(field, typed_value(value)),
        Some("gt") => Filter::gt(field, typed_value(value)),
        Some("lte") => Filter::lte(field, typed_value(value)),
        Some("lt") => Filter::lt(field, typed_value(value)),
        Some("ne") => Filter::ne(field, typed_value(value)),
        Some("in") => Filter::any_of(
            field,
            value.split(',').map(|v| typed_value(v.trim())).collect::<Vec<Bson>>(),
        ),
        Some(other) => {
            return Err(ApiError::BadRequest(format!("Unsupported filter operator {other:?}")));
        }
    })
}

fn typed_value(raw: &str) -> Bson {
    if let Ok(int) = raw.parse::<i64>() {
        Bson::Int64(int)
    } else if let Some(float) = raw.parse::<f64>().ok().filter(|f| f.is_finite()) {
        Bson::Double(float)
    } else {
        match raw {
            "true" => Bson::Boolean(true),
            "false" => Bson::Boolean(false),
            _ => Bson::String(raw.to_string()),
        }
    }
}
