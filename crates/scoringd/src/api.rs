//! Envelope validation, authentication and method dispatch.
//!
//! One call moves through
//! `Created -> StructurallyValidated -> Authenticated -> Dispatched -> Completed`
//! and stops at the first error, which is mapped to a status code here.

use chrono::{Local, NaiveDate, NaiveDateTime};
use scoring_shared::{ApiError, ApiMethod, ApiResponse, ValidationError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::auth::AuthSettings;
use crate::context::ExecutionContext;
use crate::fields::{FieldDescriptor, FieldKind};
use crate::handlers::{ClientsInterestsRequest, MethodHandler, OnlineScoreRequest};
use crate::request::{self, RequestModel, Schema, ValidatedRequest};
use crate::store::Store;

const ENVELOPE_SCHEMA: &Schema = &[
    ("account", FieldDescriptor::new(FieldKind::Char)),
    ("login", FieldDescriptor::new(FieldKind::Char).required()),
    ("token", FieldDescriptor::new(FieldKind::Char).required()),
    ("arguments", FieldDescriptor::new(FieldKind::Arguments).required()),
    (
        "method",
        FieldDescriptor::new(FieldKind::Char).required().non_nullable(),
    ),
];

/// Outer request: auth fields, method name and the handler's arguments
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRequest {
    pub account: Option<String>,
    pub login: Option<String>,
    pub token: Option<String>,
    pub arguments: Map<String, Value>,
    pub method: String,
}

impl RequestModel for MethodRequest {
    fn schema() -> &'static Schema {
        ENVELOPE_SCHEMA
    }

    fn from_validated(fields: ValidatedRequest) -> Self {
        Self {
            account: fields.text("account"),
            login: fields.text("login"),
            token: fields.text("token"),
            arguments: fields.get("arguments").as_map().cloned().unwrap_or_default(),
            method: fields.text("method").unwrap_or_default(),
        }
    }
}

pub type HandlerFn =
    fn(&Map<String, Value>, NaiveDate, &mut ExecutionContext, &dyn Store) -> Result<Value, ApiError>;

fn run_handler<H: MethodHandler>(
    arguments: &Map<String, Value>,
    today: NaiveDate,
    ctx: &mut ExecutionContext,
    store: &dyn Store,
) -> Result<Value, ApiError> {
    let handler: H = request::build(arguments, today)?;
    handler.process(ctx, store)
}

/// Method name to handler table, built once at startup
pub struct MethodRegistry {
    handlers: HashMap<&'static str, (ApiMethod, HandlerFn)>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };
        registry.register::<OnlineScoreRequest>();
        registry.register::<ClientsInterestsRequest>();
        registry
    }

    fn register<H: MethodHandler>(&mut self) {
        self.handlers
            .insert(H::METHOD.as_str(), (H::METHOD, run_handler::<H> as HandlerFn));
    }

    pub fn resolve(&self, name: &str) -> Result<(ApiMethod, HandlerFn), ValidationError> {
        self.handlers
            .get(name)
            .copied()
            .ok_or_else(|| ValidationError::unknown_method(name))
    }

    pub fn methods(&self) -> Vec<ApiMethod> {
        let mut methods: Vec<ApiMethod> = self.handlers.values().map(|(m, _)| *m).collect();
        methods.sort_by_key(|m| m.as_str());
        methods
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry point for one method call
pub struct MethodApi {
    auth: AuthSettings,
    registry: MethodRegistry,
    store: Arc<dyn Store>,
}

impl MethodApi {
    pub fn new(auth: AuthSettings, store: Arc<dyn Store>) -> Self {
        Self {
            auth,
            registry: MethodRegistry::new(),
            store,
        }
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    /// Handle a call against the local clock
    pub fn handle(&self, body: &Value, ctx: &mut ExecutionContext) -> ApiResponse {
        self.handle_at(body, ctx, Local::now().naive_local())
    }

    /// Handle a call as if the local time were `now`
    pub fn handle_at(
        &self,
        body: &Value,
        ctx: &mut ExecutionContext,
        now: NaiveDateTime,
    ) -> ApiResponse {
        match self.dispatch(body, ctx, now) {
            Ok(response) => ApiResponse::success(response),
            Err(err) => {
                match &err {
                    ApiError::Validation(e) => {
                        info!("[{}] Rejected: {:?}: {}", ctx.request_id, e.kind, e)
                    }
                    ApiError::Auth(_) => warn!("[{}] Rejected: authentication failed", ctx.request_id),
                    ApiError::Store(e) => error!("[{}] Store failure: {}", ctx.request_id, e),
                    ApiError::Internal(e) => error!("[{}] Internal error: {}", ctx.request_id, e),
                }
                ApiResponse {
                    code: err.code(),
                    response: None,
                    error: err.public_message(),
                }
            }
        }
    }

    fn dispatch(
        &self,
        body: &Value,
        ctx: &mut ExecutionContext,
        now: NaiveDateTime,
    ) -> Result<Value, ApiError> {
        let today = now.date();
        let empty = Map::new();
        let raw = body.as_object().unwrap_or(&empty);

        let envelope: MethodRequest = request::build(raw, today)?;
        debug!("[{}] Envelope valid: method={}", ctx.request_id, envelope.method);

        self.auth.check(
            envelope.account.as_deref(),
            envelope.login.as_deref(),
            envelope.token.as_deref(),
            now,
        )?;
        debug!("[{}] Authenticated login={:?}", ctx.request_id, envelope.login);

        let (method, handler) = self.registry.resolve(&envelope.method)?;
        debug!("[{}] Dispatching {}", ctx.request_id, method);

        handler(&envelope.arguments, today, ctx, self.store.as_ref())
    }
}
