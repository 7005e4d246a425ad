//! Request model: builds a validated request from a raw JSON mapping.
//!
//! Pipeline for every request variant:
//! 1. required-field check (smallest missing name wins)
//! 2. per-field contracts, in schema declaration order
//! 3. the variant's cross-field hook

use chrono::NaiveDate;
use scoring_shared::ValidationError;
use serde_json::{Map, Value};

use crate::fields::{FieldDescriptor, FieldValue};

/// Ordered field contracts of one request variant
pub type Schema = [(&'static str, FieldDescriptor)];

static NULL: FieldValue = FieldValue::Null;

/// Field values that passed their contracts, in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    fields: Vec<(&'static str, FieldValue)>,
}

impl ValidatedRequest {
    /// Value of `name`; unknown names read as null
    pub fn get(&self, name: &str) -> &FieldValue {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .unwrap_or(&NULL)
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).as_text().map(str::to_string)
    }

    /// Names of non-null fields, in schema order
    pub fn non_null(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(n, _)| *n)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }
}

/// A request variant with a fixed schema
pub trait RequestModel: Sized {
    fn schema() -> &'static Schema;

    fn from_validated(fields: ValidatedRequest) -> Self;

    /// Cross-field rule, run after every field passed on its own
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Steps 1 and 2 of the pipeline
pub fn validate_fields(
    schema: &Schema,
    raw: &Map<String, Value>,
    today: NaiveDate,
) -> Result<ValidatedRequest, ValidationError> {
    let missing = schema
        .iter()
        .filter(|(name, desc)| desc.required && !raw.contains_key(*name))
        .map(|(name, _)| *name)
        .min();
    if let Some(name) = missing {
        return Err(ValidationError::missing_field(name));
    }

    let mut fields = Vec::with_capacity(schema.len());
    for (name, desc) in schema {
        let value = desc.validate(name, raw.get(*name), today)?;
        fields.push((*name, value));
    }
    Ok(ValidatedRequest { fields })
}

/// Run the full pipeline for request variant `R`
pub fn build<R: RequestModel>(
    raw: &Map<String, Value>,
    today: NaiveDate,
) -> Result<R, ValidationError> {
    let fields = validate_fields(R::schema(), raw, today)?;
    let request = R::from_validated(fields);
    request.validate()?;
    Ok(request)
}
