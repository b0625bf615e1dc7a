//! Helper utilities for GraphQL request handling.

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Value, json};

use super::types::Envelope;
use crate::error::RequestError;

/// Maximum number of characters to keep when logging response body snippets.
pub(super) const BODY_SNIPPET_LEN: usize = 500;
/// Maximum number of characters to keep when logging request payload snippets.
pub(super) const REQUEST_SNIPPET_LEN: usize = 1024;
/// Length of the query prefix used to label anonymous operations.
pub(super) const OPERATION_SNIPPET_LEN: usize = 64;

/// Keep the first `max` characters of `text`, marking a cut with `...`.
pub(super) fn snippet(text: &str, max: usize) -> String {
    text.char_indices()
        .nth(max)
        .and_then(|(cut, _)| text.get(..cut))
        .map_or_else(|| text.to_string(), |head| format!("{head}..."))
}

/// Snippet of a raw response body, decoding it lossily.
pub(super) fn body_snippet(body: &[u8]) -> String {
    snippet(&String::from_utf8_lossy(body), BODY_SNIPPET_LEN)
}

/// Fragments that mark a variable name as carrying a credential once case
/// and separators are folded away.
const SENSITIVE_FRAGMENTS: &[&str] = &[
    "token",
    "password",
    "passwd",
    "secret",
    "apikey",
    "authorization",
    "credential",
    "privatekey",
    "bearer",
];

fn is_sensitive_key(key: &str) -> bool {
    let folded: String = key
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    folded == "auth" || SENSITIVE_FRAGMENTS.iter().any(|f| folded.contains(f))
}

/// Replace every credential-looking value in `value`, at any depth.
fn redact_sensitive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (k, v) in map.iter_mut() {
                if is_sensitive_key(k) {
                    *v = Value::String("<redacted>".into());
                } else {
                    redact_sensitive(v);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_sensitive),
        _ => {}
    }
}

/// Build a snippet of the redacted GraphQL payload.
pub(super) fn payload_snippet(payload: &Value) -> String {
    let mut redacted = payload.clone();
    redact_sensitive(&mut redacted);
    snippet(&redacted.to_string(), REQUEST_SNIPPET_LEN)
}

const OPERATION_KEYWORDS: [&str; 3] = ["query", "mutation", "subscription"];

fn is_name_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Name of the operation declared by `query`, if it has one.
///
/// Shorthand (`{ ... }`) and anonymous operations have no name.
pub(super) fn operation_name(query: &str) -> Option<&str> {
    let query = query.trim_start();
    let rest = OPERATION_KEYWORDS.iter().find_map(|kw| {
        query
            .strip_prefix(kw)
            .filter(|rest| !rest.starts_with(is_name_char))
    })?;
    let rest = rest.trim_start();
    let end = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
    rest.get(..end).filter(|name| !name.is_empty())
}

/// Label used for an operation in log events.
pub(super) fn operation_label(query: &str) -> String {
    operation_name(query).map_or_else(
        || snippet(query.trim(), OPERATION_SNIPPET_LEN),
        str::to_string,
    )
}

/// Build the JSON payload for `query` and `variables`.
///
/// `variables` must serialise to an object or `null`; `null` and `{}` omit
/// the field.
///
/// # Errors
///
/// Returns [`RequestError::Encoding`] if `variables` fails to serialise or
/// is not an object.
pub(super) fn build_payload<V: Serialize>(
    query: &str,
    variables: &V,
) -> Result<Value, RequestError> {
    let variables = serde_json::to_value(variables).map_err(|e| RequestError::Encoding {
        message: format!("serialising variables: {e}").into_boxed_str(),
    })?;
    let mut payload = json!({ "query": query });
    match variables {
        Value::Null => {}
        Value::Object(vars) if vars.is_empty() => {}
        Value::Object(vars) => {
            if let Some(obj) = payload.as_object_mut() {
                obj.insert("variables".into(), Value::Object(vars));
            }
        }
        other => {
            return Err(RequestError::Encoding {
                message: format!("variables must be a JSON object, found {}", json_kind(&other))
                    .into_boxed_str(),
            });
        }
    }
    Ok(payload)
}

/// Serialise a payload into the request body.
pub(super) fn encode_payload(payload: &Value) -> Result<Bytes, RequestError> {
    serde_json::to_vec(payload)
        .map(Bytes::from)
        .map_err(|e| RequestError::Encoding {
            message: format!("serialising request body: {e}").into_boxed_str(),
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode a response body as a GraphQL envelope.
///
/// Only the first JSON value is read; anything after it is ignored. A `null`
/// body yields an empty envelope.
///
/// # Errors
///
/// Returns the JSON path of the failure (`.` for the root) and the parser
/// message.
pub(super) fn decode_envelope(body: &[u8]) -> Result<Envelope, (String, String)> {
    let mut de = serde_json::Deserializer::from_slice(body);
    serde_path_to_error::deserialize::<_, Option<Envelope>>(&mut de)
        .map(Option::unwrap_or_default)
        .map_err(|e| (e.path().to_string(), e.into_inner().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde::ser::Error as _;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[rstest]
    #[case("{ me { id } }", 64, "{ me { id } }")]
    #[case("{ me { id } }", 4, "{ me...")]
    #[case("query", 0, "...")]
    #[case("", 0, "")]
    #[case("caf\u{e9} cr\u{e8}me", 4, "caf\u{e9}...")]
    fn snippet_cuts_on_character_boundaries(
        #[case] text: &str,
        #[case] max: usize,
        #[case] expected: &str,
    ) {
        assert_eq!(snippet(text, max), expected);
    }

    #[test]
    fn body_snippet_tolerates_invalid_utf8() {
        let snip = body_snippet(b"ok \xff\xfe end");
        assert!(snip.starts_with("ok "));
        assert!(snip.ends_with(" end"));
    }

    #[rstest]
    #[case("query Me { me { id } }", Some("Me"))]
    #[case("\n  mutation CreatePost($title: String!) { createPost(title: $title) { id } }", Some("CreatePost"))]
    #[case("subscription on_event{ ping }", Some("on_event"))]
    #[case("query($id: ID!) { node(id: $id) { id } }", None)]
    #[case("query { me { id } }", None)]
    #[case("queries { all }", None)]
    #[case("{ me { id } }", None)]
    #[case("fragment F on User { id }", None)]
    fn operation_names(#[case] query: &str, #[case] expected: Option<&str>) {
        assert_eq!(operation_name(query), expected);
    }

    #[test]
    fn anonymous_operation_is_labelled_by_query_text() {
        assert_eq!(operation_label("  query { me { id } }\n"), "query { me { id } }");
        assert_eq!(operation_label("query Me { me { id } }"), "Me");
    }

    #[rstest]
    #[case("token", true)]
    #[case("githubToken", true)]
    #[case("API-Key", true)]
    #[case("clientSecret", true)]
    #[case("auth", true)]
    #[case("author", false)]
    #[case("id", false)]
    #[case("first", false)]
    fn sensitive_keys(#[case] key: &str, #[case] expected: bool) {
        assert_eq!(is_sensitive_key(key), expected);
    }

    #[test]
    fn payload_snippet_hides_credentials_at_any_depth() {
        let payload = json!({
            "query": "mutation Login($input: LoginInput!) { login(input: $input) { ok } }",
            "variables": {
                "input": {"user": "ada", "Password": "hunter2"},
                "sessions": [{"authToken": "tok-1"}, {"id": 7}],
                "apiKey": "k-42"
            }
        });
        let snip = payload_snippet(&payload);
        for leaked in ["hunter2", "tok-1", "k-42"] {
            assert!(!snip.contains(leaked), "{leaked} leaked into {snip}");
        }
        assert!(snip.contains("ada"));
        assert!(snip.contains(r#""id":7"#));
        assert_eq!(snip.matches("<redacted>").count(), 3);
    }

    #[rstest]
    #[case(json!(null))]
    #[case(json!({}))]
    fn empty_variables_are_omitted(#[case] variables: Value) {
        let payload = build_payload("query { me { id } }", &variables).expect("payload");
        assert_eq!(payload, json!({"query": "query { me { id } }"}));
    }

    #[test]
    fn unit_and_none_mean_no_variables() {
        let payload = build_payload("{ a }", &()).expect("unit payload");
        assert!(payload.get("variables").is_none());
        let payload = build_payload("{ a }", &None::<BTreeMap<String, i32>>).expect("none payload");
        assert!(payload.get("variables").is_none());
    }

    #[test]
    fn object_variables_are_included() {
        let mut vars = BTreeMap::new();
        vars.insert("id", 42);
        let payload = build_payload("query Q($id: Int) { q(id: $id) }", &vars).expect("payload");
        assert_eq!(payload.get("variables"), Some(&json!({"id": 42})));
        let body = encode_payload(&payload).expect("body");
        let round: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(round, payload);
    }

    #[rstest]
    #[case(json!([1, 2]), "an array")]
    #[case(json!("vars"), "a string")]
    #[case(json!(3), "a number")]
    fn non_object_variables_fail_to_encode(#[case] variables: Value, #[case] kind: &str) {
        let err = build_payload("{ a }", &variables).expect_err("should fail");
        assert!(matches!(err, RequestError::Encoding { .. }));
        assert!(err.to_string().contains(kind), "{err}");
    }

    struct Unserialisable;

    impl Serialize for Unserialisable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot serialise this value"))
        }
    }

    #[test]
    fn serialisation_failure_is_an_encoding_error() {
        let err = build_payload("{ a }", &Unserialisable).expect_err("should fail");
        assert!(err.to_string().contains("cannot serialise this value"));
        assert!(err.response().is_none());
    }

    #[test]
    fn decode_envelope_reads_all_fields() {
        let body = br#"{
            "data": {"me": null},
            "errors": [{"message": "boom", "locations": [{"line": 1, "column": 9}], "path": ["me"]}],
            "extensions": {"cost": 3}
        }"#;
        let env = decode_envelope(body).expect("decode");
        assert_eq!(env.data, Some(json!({"me": null})));
        let errors = env.errors.expect("errors");
        let first = errors.first().expect("first error");
        assert_eq!(first.message, "boom");
        assert_eq!(first.locations.len(), 1);
        assert_eq!(first.path, Some(vec![json!("me")]));
        assert_eq!(env.extensions, Some(json!({"cost": 3})));
    }

    #[rstest]
    #[case(b"not json".as_slice(), ".")]
    #[case(b"[]".as_slice(), ".")]
    #[case(b"".as_slice(), ".")]
    #[case(br#"{"errors": "oops"}"#.as_slice(), "errors")]
    #[case(
        br#"{"errors": [{"message": "x", "locations": [{"line": "one", "column": 1}]}]}"#.as_slice(),
        "errors[0].locations[0].line"
    )]
    fn decode_envelope_reports_failure_path(#[case] body: &[u8], #[case] path: &str) {
        let (got, _message) = decode_envelope(body).expect_err("should fail");
        assert_eq!(got, path);
    }

    #[test]
    fn null_body_is_an_empty_envelope() {
        let env = decode_envelope(b"null").expect("decode");
        assert_eq!(env.data, None);
        assert!(env.errors.is_none());
        assert_eq!(env.extensions, None);
    }

    #[test]
    fn error_entries_tolerate_missing_or_null_fields() {
        let body = br#"{
            "data": {"a": 1},
            "errors": [
                {"locations": []},
                {"message": null, "locations": null},
                {"message": "negative", "locations": [{"line": -1, "column": -7}]}
            ]
        }"#;
        let env = decode_envelope(body).expect("decode");
        assert_eq!(env.data, Some(json!({"a": 1})));
        let errors = env.errors.expect("errors");
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["", "", "negative"]);
        assert!(errors.get(1).expect("second").locations.is_empty());
        let loc = errors
            .get(2)
            .and_then(|e| e.locations.first())
            .expect("location");
        assert_eq!((loc.line, loc.column), (-1, -7));
    }

    #[test]
    fn content_after_the_envelope_is_ignored() {
        let env = decode_envelope(br#"{"data": {"ok": true}} trailing"#).expect("decode");
        assert_eq!(env.data, Some(json!({"ok": true})));
    }

    #[test]
    fn wide_integers_keep_every_digit() {
        let env = decode_envelope(br#"{"data": {"n": 123456789012345678901234567890}}"#)
            .expect("decode");
        let n = env.data.as_ref().and_then(|d| d.get("n")).expect("n");
        assert_eq!(n.to_string(), "123456789012345678901234567890");
    }
}
