//! Request fingerprinting
//!
//! A fingerprint is `METHOD-URL-params-body`, where params and body are
//! serialized as canonical JSON (object keys sorted at every depth). Two
//! descriptors with the same semantic content always collide; the fingerprint
//! is only ever used to detect duplicate in-flight calls, never to cache
//! results.

use std::fmt;

use courier_domain::constants::STREAM_FINGERPRINT_PREFIX;
use courier_domain::{QueryParams, RequestBody, RequestDescriptor};
use serde_json::Value;

/// Deduplication key for a request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the fingerprint of `request`
///
/// Pure and infallible: stream bodies are not read, they contribute an
/// identity placeholder instead.
pub fn fingerprint(request: &RequestDescriptor) -> RequestFingerprint {
    RequestFingerprint(format!(
        "{}-{}-{}-{}",
        request.method,
        request.url,
        serialize_params(&request.params),
        serialize_body(&request.body)
    ))
}

fn serialize_params(params: &QueryParams) -> String {
    if params.is_empty() {
        return String::new();
    }
    let object = params
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect::<serde_json::Map<_, _>>();
    canonical_json_string(&Value::Object(object))
}

fn serialize_body(body: &RequestBody) -> String {
    match body {
        RequestBody::Empty => String::new(),
        RequestBody::Json(value) => canonical_json_string(value),
        RequestBody::Text(text) => Value::String(text.clone()).to_string(),
        RequestBody::Form(fields) => {
            let object = fields
                .iter()
                .map(|(key, value)| (key.clone(), Value::String(value.clone())))
                .collect::<serde_json::Map<_, _>>();
            canonical_json_string(&Value::Object(object))
        }
        RequestBody::Stream(stream) => format!("{STREAM_FINGERPRINT_PREFIX}{}", stream.identity()),
    }
}

fn canonicalize_json_value(value: &Value) -> Value {
    match value {
        Value::Array(values) => Value::Array(values.iter().map(canonicalize_json_value).collect()),
        Value::Object(map) => {
            let mut entries = map.iter().collect::<Vec<_>>();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, nested) in entries {
                out.insert(key.clone(), canonicalize_json_value(nested));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn canonical_json_string(value: &Value) -> String {
    canonicalize_json_value(value).to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use courier_domain::{Method, StreamBody};
    use serde_json::json;

    use super::*;

    #[test]
    fn format_joins_method_url_params_and_body() {
        let request = RequestDescriptor::post("/orders")
            .param("page", 1)
            .json_body(json!({ "sku": "A-1", "qty": 2 }));

        assert_eq!(
            fingerprint(&request).as_str(),
            r#"POST-/orders-{"page":1}-{"qty":2,"sku":"A-1"}"#
        );
    }

    #[test]
    fn bare_get_has_empty_segments() {
        let request = RequestDescriptor::get("/profile");
        assert_eq!(fingerprint(&request).as_str(), "GET-/profile--");
    }

    #[test]
    fn param_insertion_order_does_not_matter() {
        let a = RequestDescriptor::get("/orders").param("page", 1).param("status", "open");
        let b = RequestDescriptor::get("/orders").param("status", "open").param("page", 1);

        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn nested_body_keys_are_sorted() {
        let mut first = serde_json::Map::new();
        first.insert("z".into(), json!(1));
        first.insert("a".into(), json!({ "y": true, "b": [ { "d": 1, "c": 2 } ] }));

        let mut second = serde_json::Map::new();
        second.insert("a".into(), json!({ "b": [ { "c": 2, "d": 1 } ], "y": true }));
        second.insert("z".into(), json!(1));

        let a = RequestDescriptor::put("/orders/1").json_body(Value::Object(first));
        let b = RequestDescriptor::put("/orders/1").json_body(Value::Object(second));

        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn different_content_produces_different_fingerprints() {
        let base = RequestDescriptor::get("/orders").param("page", 1);

        assert_ne!(fingerprint(&base), fingerprint(&base.clone().param("page", 2)));
        assert_ne!(
            fingerprint(&base),
            fingerprint(&RequestDescriptor::new(Method::Delete, "/orders").param("page", 1))
        );
    }

    #[test]
    fn text_and_form_bodies_are_serialized() {
        let text = RequestDescriptor::post("/chat").text_body("hi");
        assert_eq!(fingerprint(&text).as_str(), r#"POST-/chat--"hi""#);

        let mut fields = BTreeMap::new();
        fields.insert("password".to_string(), "x".to_string());
        fields.insert("email".to_string(), "a@b.c".to_string());
        let form = RequestDescriptor::post("/login").form_body(fields);
        assert_eq!(fingerprint(&form).as_str(), r#"POST-/login--{"email":"a@b.c","password":"x"}"#);
    }

    #[test]
    fn stream_body_degrades_to_identity_placeholder() {
        let stream = StreamBody::new("image/png", vec![0; 1024]);
        let upload = RequestDescriptor::post("/avatar").stream_body(stream.clone());
        let same_stream = RequestDescriptor::post("/avatar").stream_body(stream.clone());
        let other_stream = RequestDescriptor::post("/avatar")
            .stream_body(StreamBody::new("image/png", vec![0; 1024]));

        let key = fingerprint(&upload);
        assert_eq!(key.as_str(), format!("POST-/avatar--stream:{}", stream.identity()));
        assert_eq!(key, fingerprint(&same_stream));
        assert_ne!(key, fingerprint(&other_stream));
    }
}
