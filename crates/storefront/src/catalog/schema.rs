//! Schema validation for catalog payloads.
//!
//! The catalog service is outside our control and has changed shape across
//! revisions, so payloads are checked field by field before any [`Product`]
//! is built. The first violation fails the whole payload.
//!
//! Accepted shapes:
//!
//! ```json
//! [ { "id": "yam-01", "name": "Yam", "price": 8.5, "category": "tubers",
//!     "unit": "tuber", "description": null, "image": "https://...",
//!     "available_stock": 12 } ]
//! ```
//!
//! or the same array wrapped as `{ "products": [...] }`. `id` may be a string
//! or an integer, `price` a number or numeric string, and `available_stock` a
//! count or a legacy boolean. Older revisions send `inStock` instead.
//!
//! `category` is optional; records without one are filed under
//! [`UNCATEGORIZED`](soko_core::UNCATEGORIZED). Missing or null stock counts
//! as sold out.

use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use soko_core::{Category, Price, Product, ProductId, Stock};
use thiserror::Error;

/// A catalog payload that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The payload is neither an array nor `{ "products": [...] }`.
    #[error("expected a list of products")]
    NotAList,

    /// A record is not a JSON object.
    #[error("record {index}: expected an object")]
    NotAnObject { index: usize },

    /// A required field is absent or null.
    #[error("record {index}: missing `{field}`")]
    MissingField { index: usize, field: &'static str },

    /// A field has the wrong type or an out-of-range value.
    #[error("record {index}: invalid `{field}`: {reason}")]
    InvalidField {
        index: usize,
        field: &'static str,
        reason: String,
    },

    /// Two records share an id.
    #[error("record {index}: duplicate id `{id}`")]
    DuplicateId { index: usize, id: String },
}

/// Validate a catalog payload and build its products, preserving order.
///
/// # Errors
///
/// Returns the first [`SchemaError`] encountered.
pub fn validate_catalog(payload: &Value) -> Result<Vec<Product>, SchemaError> {
    let records = match payload {
        Value::Array(records) => records,
        Value::Object(map) => map
            .get("products")
            .and_then(Value::as_array)
            .ok_or(SchemaError::NotAList)?,
        _ => return Err(SchemaError::NotAList),
    };

    let mut seen = HashSet::with_capacity(records.len());
    let mut products = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let object = record
            .as_object()
            .ok_or(SchemaError::NotAnObject { index })?;
        let product = validate_record(index, object)?;

        if !seen.insert(product.id.clone()) {
            return Err(SchemaError::DuplicateId {
                index,
                id: product.id.into_inner(),
            });
        }
        products.push(product);
    }

    Ok(products)
}

fn validate_record(index: usize, record: &Map<String, Value>) -> Result<Product, SchemaError> {
    let invalid = |field: &'static str, reason: &str| SchemaError::InvalidField {
        index,
        field,
        reason: reason.to_string(),
    };

    let id = match required(index, record, "id")? {
        Value::String(s) => ProductId::parse(s).map_err(|e| invalid("id", &e.to_string()))?,
        Value::Number(n) if n.is_i64() || n.is_u64() => ProductId::parse(&n.to_string())
            .map_err(|e| invalid("id", &e.to_string()))?,
        _ => return Err(invalid("id", "expected a string or integer")),
    };

    let name = required_str(index, record, "name")?;
    if name.trim().is_empty() {
        return Err(invalid("name", "cannot be empty"));
    }

    let amount = match required(index, record, "price")? {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .map_err(|e| invalid("price", &e.to_string()))?,
        Value::String(s) => {
            Decimal::from_str(s.trim()).map_err(|e| invalid("price", &e.to_string()))?
        }
        _ => return Err(invalid("price", "expected a number")),
    };
    let price = Price::new(amount).map_err(|e| invalid("price", &e.to_string()))?;

    let category = match optional_str(index, record, "category")? {
        Some(category) => {
            Category::parse(&category).map_err(|e| invalid("category", &e.to_string()))?
        }
        None => Category::uncategorized(),
    };

    let available_stock = match present(record, "available_stock") {
        Some(value) => stock(value).ok_or_else(|| {
            invalid("available_stock", "expected a non-negative count or boolean")
        })?,
        None => match present(record, "inStock") {
            Some(value) => stock(value)
                .ok_or_else(|| invalid("inStock", "expected a non-negative count or boolean"))?,
            None => Stock::new(0),
        },
    };

    Ok(Product {
        id,
        name: name.trim().to_string(),
        price,
        unit: optional_str(index, record, "unit")?.unwrap_or_default(),
        category,
        description: optional_str(index, record, "description")?,
        image: match optional_str(index, record, "image")? {
            Some(image) => Some(image),
            None => optional_str(index, record, "image_url")?,
        },
        available_stock,
    })
}

/// A field that is present and not null.
fn present<'a>(record: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    record.get(field).filter(|value| !value.is_null())
}

fn stock(value: &Value) -> Option<Stock> {
    match value {
        Value::Bool(available) => Some(Stock::new(u32::from(*available))),
        Value::Number(n) => n
            .as_u64()
            .and_then(|count| u32::try_from(count).ok())
            .map(Stock::new),
        _ => None,
    }
}

fn required<'a>(
    index: usize,
    record: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, SchemaError> {
    match record.get(field) {
        None | Some(Value::Null) => Err(SchemaError::MissingField { index, field }),
        Some(value) => Ok(value),
    }
}

fn required_str<'a>(
    index: usize,
    record: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, SchemaError> {
    required(index, record, field)?
        .as_str()
        .ok_or_else(|| SchemaError::InvalidField {
            index,
            field,
            reason: "expected a string".to_string(),
        })
}

/// A string field that may be absent or null. Blank strings count as absent.
fn optional_str(
    index: usize,
    record: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, SchemaError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(SchemaError::InvalidField {
            index,
            field,
            reason: "expected a string".to_string(),
        }),
    }
}
