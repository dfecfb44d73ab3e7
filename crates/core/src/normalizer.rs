//! Response normalization
//!
//! Folds the two ways a backend reports failure (an HTTP status, or a 2xx
//! body with `"success": false`) into a single [`NormalizedError`] shape, so
//! callers only ever branch on the error kind.
//!
//! 401 responses never reach the normalizer; the pipeline routes them to the
//! refresh coordinator first.

use courier_domain::constants::LOGICAL_FAILURE_FALLBACK_MESSAGE;
use courier_domain::{ApiResponse, FieldErrors, NormalizedError, Result};
use serde_json::Value;
use tracing::debug;

/// Converts transport responses into results
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Pass successful responses through, reject everything else
    pub fn normalize(&self, response: ApiResponse) -> Result<ApiResponse> {
        if !response.is_success() {
            return Err(self.status_error(&response));
        }

        match response.body_json() {
            Some(body) if is_logical_failure(&body) => {
                let message = message_from(&body)
                    .unwrap_or_else(|| LOGICAL_FAILURE_FALLBACK_MESSAGE.to_string());
                debug!(status = response.status(), %message, "2xx response flagged as failure");
                Err(NormalizedError::logical_failure(response.status(), message)
                    .with_field_errors(field_errors_from(&body)))
            }
            _ => Ok(response),
        }
    }

    /// Error for a non-2xx response
    pub fn status_error(&self, response: &ApiResponse) -> NormalizedError {
        let status = response.status();
        let body = response.body_json();

        let message = body
            .as_ref()
            .and_then(message_from)
            .unwrap_or_else(|| format!("request failed with status {status}"));
        let field_errors = body.as_ref().map(field_errors_from).unwrap_or_default();

        NormalizedError::http_status(status, message).with_field_errors(field_errors)
    }
}

fn is_logical_failure(body: &Value) -> bool {
    matches!(body.get("success"), Some(Value::Bool(false)))
}

fn message_from(body: &Value) -> Option<String> {
    let non_empty =
        |value: &Value| value.as_str().filter(|s| !s.trim().is_empty()).map(str::to_string);

    body.get("message")
        .and_then(non_empty)
        .or_else(|| body.get("error").and_then(non_empty))
        .or_else(|| body.pointer("/error/message").and_then(non_empty))
}

fn field_errors_from(body: &Value) -> FieldErrors {
    let Some(errors) = body
        .get("errors")
        .or_else(|| body.pointer("/error/errors"))
        .and_then(Value::as_object)
    else {
        return FieldErrors::new();
    };

    errors
        .iter()
        .filter_map(|(field, value)| {
            let messages = match value {
                Value::String(message) => vec![message.clone()],
                Value::Array(items) => {
                    items.iter().filter_map(Value::as_str).map(str::to_string).collect()
                }
                _ => Vec::new(),
            };
            (!messages.is_empty()).then(|| (field.clone(), messages))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use courier_domain::ErrorKind;
    use serde_json::json;

    use super::*;

    #[test]
    fn success_flag_false_becomes_logical_failure() {
        let response = ApiResponse::json_value(200, &json!({ "success": false, "message": "X" }));

        let err = ResponseNormalizer.normalize(response).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LogicalFailure);
        assert_eq!(err.message(), "X");
        assert_eq!(err.status(), Some(200));
    }

    #[test]
    fn logical_failure_matches_http_error_shape() {
        let body = json!({
            "success": false,
            "message": "Validation failed",
            "errors": { "email": "taken", "qty": ["too small", "not a number"] }
        });

        let logical =
            ResponseNormalizer.normalize(ApiResponse::json_value(200, &body)).unwrap_err();
        let http = ResponseNormalizer.normalize(ApiResponse::json_value(422, &body)).unwrap_err();

        assert_eq!(logical.message(), http.message());
        assert_eq!(logical.field_errors(), http.field_errors());
        assert_eq!(logical.field_errors()["email"], vec!["taken"]);
        assert_eq!(logical.field_errors()["qty"].len(), 2);
        assert_eq!(http.kind(), ErrorKind::TransportFailure);
        assert_eq!(http.status(), Some(422));
    }

    #[test]
    fn successful_bodies_pass_through() {
        for body in [json!({ "success": true, "data": [] }), json!([1, 2]), json!({ "id": 7 })] {
            let response = ApiResponse::json_value(200, &body);
            assert!(ResponseNormalizer.normalize(response).is_ok());
        }
        assert!(ResponseNormalizer.normalize(ApiResponse::new(204, Vec::new())).is_ok());
        assert!(ResponseNormalizer.normalize(ApiResponse::new(200, "plain text")).is_ok());
    }

    #[test]
    fn success_string_is_not_a_failure_marker() {
        let response = ApiResponse::json_value(200, &json!({ "success": "false" }));
        assert!(ResponseNormalizer.normalize(response).is_ok());
    }

    #[test]
    fn missing_message_falls_back() {
        let logical = ResponseNormalizer
            .normalize(ApiResponse::json_value(200, &json!({ "success": false })))
            .unwrap_err();
        assert_eq!(logical.message(), "Request failed");

        let http = ResponseNormalizer.normalize(ApiResponse::new(503, "")).unwrap_err();
        assert_eq!(http.message(), "request failed with status 503");
    }

    #[test]
    fn nested_error_message_is_used() {
        let body = json!({
            "error": { "message": "bad sku", "errors": { "sku": ["unknown"] } }
        });
        let response = ApiResponse::json_value(400, &body);

        let err = ResponseNormalizer.normalize(response).unwrap_err();
        assert_eq!(err.message(), "bad sku");
        assert_eq!(err.field_errors()["sku"], vec!["unknown"]);
    }
}
