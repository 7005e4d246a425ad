//! Per-call execution context.

use serde::Serialize;

/// Diagnostic record threaded through one call.
///
/// Keys: `request_id` (always), `has` (online_score), `nclients`
/// (client_instrests).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionContext {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nclients: Option<usize>,
}

impl ExecutionContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    pub fn record_has<S: AsRef<str>>(&mut self, fields: &[S]) {
        self.has = Some(fields.iter().map(|f| f.as_ref().to_string()).collect());
    }

    pub fn record_nclients(&mut self, count: usize) {
        self.nclients = Some(count);
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_serializes_only_set_keys() {
        let mut ctx = ExecutionContext::new("abc");
        assert_eq!(ctx.to_value(), json!({"request_id": "abc"}));

        ctx.record_nclients(2);
        assert_eq!(ctx.to_value(), json!({"request_id": "abc", "nclients": 2}));
    }
}
