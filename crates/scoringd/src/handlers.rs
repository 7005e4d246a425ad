//! Method handlers: `online_score` and `client_instrests`.

use chrono::NaiveDate;
use scoring_shared::{ApiError, ApiMethod, ValidationError};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::context::ExecutionContext;
use crate::fields::{FieldDescriptor, FieldKind};
use crate::request::{RequestModel, Schema, ValidatedRequest};
use crate::scoring::{self, ScoreInput};
use crate::store::Store;

/// A request variant that can be dispatched by method name
pub trait MethodHandler: RequestModel {
    const METHOD: ApiMethod;

    fn process(&self, ctx: &mut ExecutionContext, store: &dyn Store) -> Result<Value, ApiError>;
}

// Declaration order is the order reported in the `has` context key.
const ONLINE_SCORE_SCHEMA: &Schema = &[
    ("phone", FieldDescriptor::new(FieldKind::Phone)),
    ("email", FieldDescriptor::new(FieldKind::Email)),
    ("first_name", FieldDescriptor::new(FieldKind::Char)),
    ("last_name", FieldDescriptor::new(FieldKind::Char)),
    ("birthday", FieldDescriptor::new(FieldKind::BirthDay)),
    ("gender", FieldDescriptor::new(FieldKind::Gender)),
];

#[derive(Debug, Clone, PartialEq)]
pub struct OnlineScoreRequest {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<i64>,
    /// Non-null fields, in schema order
    pub has: Vec<&'static str>,
}

impl RequestModel for OnlineScoreRequest {
    fn schema() -> &'static Schema {
        ONLINE_SCORE_SCHEMA
    }

    fn from_validated(fields: ValidatedRequest) -> Self {
        Self {
            phone: fields.text("phone"),
            email: fields.text("email"),
            first_name: fields.text("first_name"),
            last_name: fields.text("last_name"),
            birthday: fields.get("birthday").as_date(),
            gender: fields.get("gender").as_int(),
            has: fields.non_null(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let phone_email = self.phone.is_some() && self.email.is_some();
        let full_name = self.first_name.is_some() && self.last_name.is_some();
        let birthday_gender = self.birthday.is_some() && self.gender.is_some();

        if phone_email || full_name || birthday_gender {
            Ok(())
        } else {
            Err(ValidationError::cross_field(
                "at least one pair is required: phone and email, \
                 first_name and last_name, or birthday and gender",
            ))
        }
    }
}

impl MethodHandler for OnlineScoreRequest {
    const METHOD: ApiMethod = ApiMethod::OnlineScore;

    fn process(&self, ctx: &mut ExecutionContext, store: &dyn Store) -> Result<Value, ApiError> {
        let input = ScoreInput {
            phone: self.phone.as_deref(),
            email: self.email.as_deref(),
            birthday: self.birthday,
            gender: self.gender,
            first_name: self.first_name.as_deref(),
            last_name: self.last_name.as_deref(),
        };
        let score = scoring::get_score(store, &input);
        ctx.record_has(self.has.as_slice());

        debug!("online_score: score={} has={:?}", score, self.has);
        Ok(json!({ "score": score }))
    }
}

const CLIENTS_INTERESTS_SCHEMA: &Schema = &[
    (
        "client_ids",
        FieldDescriptor::new(FieldKind::ClientIds)
            .required()
            .non_nullable(),
    ),
    ("date", FieldDescriptor::new(FieldKind::Date)),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ClientsInterestsRequest {
    pub client_ids: Vec<i64>,
    pub date: Option<NaiveDate>,
}

impl RequestModel for ClientsInterestsRequest {
    fn schema() -> &'static Schema {
        CLIENTS_INTERESTS_SCHEMA
    }

    fn from_validated(fields: ValidatedRequest) -> Self {
        Self {
            client_ids: fields
                .get("client_ids")
                .as_ids()
                .map(<[i64]>::to_vec)
                .unwrap_or_default(),
            date: fields.get("date").as_date(),
        }
    }
}

impl MethodHandler for ClientsInterestsRequest {
    const METHOD: ApiMethod = ApiMethod::ClientsInterests;

    fn process(&self, ctx: &mut ExecutionContext, store: &dyn Store) -> Result<Value, ApiError> {
        let mut interests = Map::new();
        for id in &self.client_ids {
            let list = scoring::get_interests(store, *id)?;
            interests.insert(id.to_string(), json!(list));
        }
        ctx.record_nclients(self.client_ids.len());

        debug!("client_instrests: nclients={}", self.client_ids.len());
        Ok(Value::Object(interests))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::build;
    use crate::store::MemoryStore;
    use scoring_shared::ValidationKind;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_score_pairs() {
        let ok = [
            json!({"phone": "79001112233", "email": "a@b.c"}),
            json!({"first_name": "A", "last_name": "B"}),
            json!({"birthday": "01.01.1988", "gender": 0}),
        ];
        for input in ok {
            assert!(build::<OnlineScoreRequest>(&args(input.clone()), today()).is_ok(), "{}", input);
        }

        let bad = [
            json!({}),
            json!({"phone": "79001112233", "first_name": "A"}),
            json!({"email": "a@b.c", "last_name": "B", "gender": 1}),
            json!({"phone": null, "email": "a@b.c"}),
        ];
        for input in bad {
            let err = build::<OnlineScoreRequest>(&args(input.clone()), today()).unwrap_err();
            assert_eq!(err.kind, ValidationKind::CrossFieldInvalid, "{}", input);
        }
    }

    #[test]
    fn test_score_field_error_wins_over_pairs() {
        let err = build::<OnlineScoreRequest>(&args(json!({"phone": "123"})), today()).unwrap_err();
        assert_eq!(err.kind, ValidationKind::FieldInvalid);
        assert_eq!(err.field.as_deref(), Some("phone"));
    }

    #[test]
    fn test_score_records_has_in_schema_order() {
        let store = MemoryStore::default();
        let request = build::<OnlineScoreRequest>(
            &args(json!({"last_name": "B", "gender": "1", "first_name": "A"})),
            today(),
        )
        .unwrap();
        let mut ctx = ExecutionContext::new("r1");

        let result = request.process(&mut ctx, &store).unwrap();
        assert_eq!(result, json!({"score": 0.5}));
        assert_eq!(
            ctx.has,
            Some(vec!["first_name".to_string(), "last_name".to_string(), "gender".to_string()])
        );
    }

    #[test]
    fn test_interests_in_caller_order() {
        let store = MemoryStore::default();
        store.set("i:2", br#"["cars"]"#).unwrap();
        let request =
            build::<ClientsInterestsRequest>(&args(json!({"client_ids": [2, "1"]})), today()).unwrap();
        let mut ctx = ExecutionContext::new("r2");

        let result = request.process(&mut ctx, &store).unwrap();
        let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["2", "1"]);
        assert_eq!(result["2"], json!(["cars"]));
        assert_eq!(result["1"], json!([]));
        assert_eq!(ctx.nclients, Some(2));
    }

    #[test]
    fn test_interests_require_client_ids() {
        let err = build::<ClientsInterestsRequest>(&args(json!({"date": "01.02.2008"})), today())
            .unwrap_err();
        assert_eq!(err.kind, ValidationKind::MissingField);
        assert_eq!(err.field.as_deref(), Some("client_ids"));

        let err = build::<ClientsInterestsRequest>(&args(json!({"client_ids": null})), today())
            .unwrap_err();
        assert_eq!(err.kind, ValidationKind::FieldInvalid);
    }
}
