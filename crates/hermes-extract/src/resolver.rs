//! Argument resolution.
//!
//! Sources, lowest priority first:
//!
//! 1. the query string, or for body-bearing requests with a form content type
//!    the query string together with the form fields
//! 2. the JSON body (body-bearing verbs, `application/json`, request bypass
//!    off); malformed or empty bodies fail
//! 3. path parameters
//!
//! Sources are merged as JSON, then the argument is decoded once. Values from
//! keyed sources go through the [`lenient`](crate::lenient) rules; body values
//! must match the target type as they are. The decoded argument is validated.

use std::collections::BTreeSet;

use hermes_core::{ArgShape, Argument, Params};
use serde_json::{Map, Value};

use crate::error::{ExtractionError, ExtractionSource};
use crate::keyed::{match_field, KeyedValues};
use crate::lenient;
use crate::multipart::{self, MultipartConfig};
use crate::request::InboundRequest;

/// Default maximum JSON or form body size (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Maximum size of a JSON or urlencoded body.
    pub max_body_size: usize,
    /// Multipart limits.
    pub multipart: MultipartConfig,
    /// Leave JSON bodies to the method.
    pub bypass_request_body: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            multipart: MultipartConfig::default(),
            bypass_request_body: false,
        }
    }
}

/// Resolves requests into arguments of one shape.
///
/// # Example
///
/// ```rust
/// use hermes_core::{ArgContract, Argument, Params};
/// use hermes_extract::{ArgumentResolver, InboundRequest, ResolverConfig};
/// use http::Method;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Move {
///     from: String,
///     to: String,
///     steps: u32,
/// }
///
/// impl Argument for Move {}
///
/// # tokio_test::block_on(async {
/// let contract = ArgContract::inspect::<Move>().unwrap();
/// let resolver = ArgumentResolver::new(*contract.shape(), ResolverConfig::default());
///
/// let req = InboundRequest::builder()
///     .method(Method::POST)
///     .uri("/move?steps=1&from=query")
///     .header("content-type", "application/json")
///     .body(r#"{"from": "body", "to": "body", "steps": 2}"#)
///     .build();
/// let params: Params = [("to", "path")].into_iter().collect();
///
/// let mv: Move = resolver.resolve(&req, Some(&params)).await.unwrap();
/// assert_eq!((mv.from.as_str(), mv.to.as_str(), mv.steps), ("body", "path", 2));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct ArgumentResolver {
    shape: ArgShape,
    config: ResolverConfig,
}

impl ArgumentResolver {
    /// Creates a resolver for arguments of `shape`.
    #[must_use]
    pub fn new(shape: ArgShape, config: ResolverConfig) -> Self {
        Self { shape, config }
    }

    /// The argument shape this resolver produces.
    #[must_use]
    pub fn shape(&self) -> &ArgShape {
        &self.shape
    }

    /// The resolver settings.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves, decodes and validates the argument.
    ///
    /// Validation runs for every argument; maps and sequences accept
    /// anything.
    pub async fn resolve<A: Argument>(
        &self,
        request: &InboundRequest,
        params: Option<&Params>,
    ) -> Result<A, ExtractionError> {
        let merged = self.merge(request, params).await?;

        let argument: A = lenient::from_merged(merged.value(), merged.keyed_keys())
            .map_err(|e| ExtractionError::decode_failed(std::any::type_name::<A>(), e))?;

        argument
            .validate_argument()
            .map_err(|e| ExtractionError::validation_failed(&e))?;

        Ok(argument)
    }

    /// Merges every source into one JSON value without decoding it.
    pub async fn merge(
        &self,
        request: &InboundRequest,
        params: Option<&Params>,
    ) -> Result<MergedArgument, ExtractionError> {
        let keyed = self.keyed_values(request).await?;
        let mut merged = match self.shape {
            ArgShape::Sequence => MergedArgument::new(Value::Array(Vec::new())),
            ArgShape::Record { .. } | ArgShape::Map => {
                MergedArgument::keyed(keyed.into_object(&self.shape))
            }
        };

        if self.reads_json_body(request) {
            let body = self.json_body(request)?;
            merged.overlay_body(body);
        }

        if let Some(params) = params.filter(|p| !p.is_empty()) {
            let path = KeyedValues::from_params(params).into_object(&self.shape);
            merged.overlay_keyed(path);
        }

        Ok(merged)
    }

    async fn keyed_values(&self, request: &InboundRequest) -> Result<KeyedValues, ExtractionError> {
        let mut keyed = KeyedValues::from_query(request.query_string())?;
        if !request.is_body_bearing() {
            return Ok(keyed);
        }

        if request.is_multipart() {
            let fields = multipart::read_text_fields(
                request.headers(),
                request.body().clone(),
                &self.config.multipart,
            )
            .await?;
            keyed.extend(fields);
        } else if request.is_form_urlencoded() && !request.body().is_empty() {
            self.check_body_size(request, ExtractionSource::Form)?;
            let text = std::str::from_utf8(request.body())
                .map_err(|e| ExtractionError::malformed(ExtractionSource::Form, e))?;
            let form = KeyedValues::from_urlencoded(text)
                .map_err(|e| ExtractionError::malformed(ExtractionSource::Form, e))?;
            keyed.extend(form);
        }

        Ok(keyed)
    }

    fn reads_json_body(&self, request: &InboundRequest) -> bool {
        request.is_body_bearing() && !self.config.bypass_request_body && request.is_json()
    }

    fn json_body(&self, request: &InboundRequest) -> Result<Value, ExtractionError> {
        self.check_body_size(request, ExtractionSource::Body)?;
        if request.body().is_empty() {
            return Err(ExtractionError::empty_body());
        }

        let mut body: Value = serde_json::from_slice(request.body())
            .map_err(|e| ExtractionError::malformed(ExtractionSource::Body, e))?;

        if let (ArgShape::Record { fields, .. }, Value::Object(object)) = (&self.shape, &mut body) {
            *object = rename_to_fields(std::mem::take(object), *fields);
        }
        Ok(body)
    }

    fn check_body_size(
        &self,
        request: &InboundRequest,
        source: ExtractionSource,
    ) -> Result<(), ExtractionError> {
        let size = request.body().len();
        if size > self.config.max_body_size {
            return Err(ExtractionError::payload_too_large(
                source,
                self.config.max_body_size,
                size,
            ));
        }
        Ok(())
    }
}

/// Argument data merged from every source.
///
/// Remembers which top-level keys still hold a value from a keyed source
/// (query, form, multipart or path); only those coerce from strings.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedArgument {
    value: Value,
    keyed: BTreeSet<String>,
}

impl MergedArgument {
    fn new(value: Value) -> Self {
        Self {
            value,
            keyed: BTreeSet::new(),
        }
    }

    fn keyed(object: Map<String, Value>) -> Self {
        let keyed = object.keys().cloned().collect();
        Self {
            value: Value::Object(object),
            keyed,
        }
    }

    /// The merged value.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Top-level keys whose value came from a keyed source.
    #[must_use]
    pub fn keyed_keys(&self) -> &BTreeSet<String> {
        &self.keyed
    }

    /// Consumes the merge, returning the value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    fn overlay_body(&mut self, body: Value) {
        match &body {
            Value::Null => {}
            Value::Object(object) => {
                for (key, value) in object {
                    if !value.is_null() {
                        self.keyed.remove(key);
                    }
                }
            }
            _ => self.keyed.clear(),
        }
        deep_merge(&mut self.value, body);
    }

    fn overlay_keyed(&mut self, object: Map<String, Value>) {
        match &mut self.value {
            Value::Object(target) => {
                self.keyed.extend(object.keys().cloned());
                target.extend(object);
            }
            _ => tracing::debug!("path parameters ignored for non-object argument"),
        }
    }
}

/// Renames top-level keys that match a field only case-insensitively.
/// Keys that match nothing are kept; the decoder ignores them.
fn rename_to_fields(object: Map<String, Value>, fields: &'static [&'static str]) -> Map<String, Value> {
    let mut renamed = Map::with_capacity(object.len());
    let mut folded = Vec::new();
    for (key, value) in object {
        match match_field(&key, fields) {
            Some(field) if field != key => folded.push((field, value)),
            _ => {
                renamed.insert(key, value);
            }
        }
    }
    // Exact keys win over folded ones.
    for (field, value) in folded {
        renamed.entry(field).or_insert(value);
    }
    renamed
}

/// Merges `overlay` into `base`: objects merge key by key, recursively;
/// anything else replaces. A `null` overlay leaves `base` untouched.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::ArgContract;
    use http::Method;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::collections::HashMap;
    use validator::Validate;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Pair {
        #[serde(rename = "A")]
        a: i64,
        #[serde(rename = "B", default)]
        b: i64,
    }

    impl Argument for Pair {}

    #[derive(Debug, Serialize, Deserialize, Validate)]
    struct Bounded {
        #[validate(range(min = 1, max = 10))]
        n: u8,
    }

    hermes_core::validated_argument!(Bounded);

    fn resolver_for<A: Argument>() -> ArgumentResolver {
        let contract = ArgContract::inspect::<A>().unwrap();
        ArgumentResolver::new(*contract.shape(), ResolverConfig::default())
    }

    fn post_json(uri: &str, body: &'static str) -> InboundRequest {
        InboundRequest::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .build()
    }

    #[tokio::test]
    async fn test_query_only_case_insensitive() {
        let req = InboundRequest::builder().uri("/?a=1&b=2").build();
        let pair: Pair = resolver_for::<Pair>().resolve(&req, None).await.unwrap();
        assert_eq!(pair, Pair { a: 1, b: 2 });
    }

    #[tokio::test]
    async fn test_body_over_query() {
        let req = post_json("/?A=1&B=7", r#"{"A": 5}"#);
        let pair: Pair = resolver_for::<Pair>().resolve(&req, None).await.unwrap();
        assert_eq!(pair, Pair { a: 5, b: 7 });
    }

    #[tokio::test]
    async fn test_path_over_body() {
        let req = post_json("/", r#"{"A": 1, "B": 2}"#);
        let params: Params = [("A", "2")].into_iter().collect();
        let pair: Pair = resolver_for::<Pair>()
            .resolve(&req, Some(&params))
            .await
            .unwrap();
        assert_eq!(pair, Pair { a: 2, b: 2 });
    }

    #[tokio::test]
    async fn test_body_keys_match_case_insensitively() {
        let req = post_json("/", r#"{"a": 3, "b": 4}"#);
        let pair: Pair = resolver_for::<Pair>().resolve(&req, None).await.unwrap();
        assert_eq!(pair, Pair { a: 3, b: 4 });
    }

    #[tokio::test]
    async fn test_missing_required_field() {
        let req = InboundRequest::builder().uri("/?b=1").build();
        let err = resolver_for::<Pair>()
            .resolve::<Pair>(&req, None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DECODE_FAILED");
        assert!(err.to_string().contains("missing field `A`"));
    }

    #[tokio::test]
    async fn test_malformed_and_empty_bodies() {
        let resolver = resolver_for::<Pair>();

        let err = resolver
            .resolve::<Pair>(&post_json("/", "{312}"), None)
            .await
            .unwrap_err();
        assert_eq!(err.extraction_source(), ExtractionSource::Body);
        assert_eq!(err.error_code(), "MALFORMED_INPUT");

        let err = resolver
            .resolve::<Pair>(&post_json("/", ""), None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_BODY");
    }

    #[tokio::test]
    async fn test_null_body_is_noop() {
        let req = post_json("/?A=9", "null");
        let pair: Pair = resolver_for::<Pair>().resolve(&req, None).await.unwrap();
        assert_eq!(pair.a, 9);
    }

    #[tokio::test]
    async fn test_body_ignored_without_json_content_type() {
        let req = InboundRequest::builder()
            .method(Method::POST)
            .uri("/?A=1")
            .header("content-type", "text/plain")
            .body("{not json")
            .build();
        let pair: Pair = resolver_for::<Pair>().resolve(&req, None).await.unwrap();
        assert_eq!(pair.a, 1);
    }

    #[tokio::test]
    async fn test_body_ignored_for_get() {
        let req = InboundRequest::builder()
            .uri("/?A=4")
            .header("content-type", "application/json")
            .body("{312}")
            .build();
        let pair: Pair = resolver_for::<Pair>().resolve(&req, None).await.unwrap();
        assert_eq!(pair.a, 4);
    }

    #[tokio::test]
    async fn test_request_bypass_skips_body() {
        let contract = ArgContract::inspect::<Pair>().unwrap();
        let resolver = ArgumentResolver::new(
            *contract.shape(),
            ResolverConfig {
                bypass_request_body: true,
                ..ResolverConfig::default()
            },
        );
        let req = post_json("/?A=1", "{312}");
        let pair: Pair = resolver.resolve(&req, None).await.unwrap();
        assert_eq!(pair.a, 1);
    }

    #[tokio::test]
    async fn test_validation_runs_for_records() {
        let resolver = resolver_for::<Bounded>();
        let err = resolver
            .resolve::<Bounded>(&InboundRequest::builder().uri("/?n=42").build(), None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert_eq!(err.field(), Some("n"));

        let ok: Bounded = resolver
            .resolve(&InboundRequest::builder().uri("/?n=3").build(), None)
            .await
            .unwrap();
        assert_eq!(ok.n, 3);
    }

    #[tokio::test]
    async fn test_map_argument_from_all_sources() {
        let req = post_json("/?x=1&y=2", r#"{"y": "body", "z": true}"#);
        let params: Params = [("x", "path")].into_iter().collect();
        let map: HashMap<String, Value> = resolver_for::<HashMap<String, Value>>()
            .resolve(&req, Some(&params))
            .await
            .unwrap();

        assert_eq!(map["x"], json!("path"));
        assert_eq!(map["y"], json!("body"));
        assert_eq!(map["z"], json!(true));
    }

    #[tokio::test]
    async fn test_sequence_argument_from_body() {
        let req = post_json("/?ignored=1", "[3, 1, 2]");
        let params: Params = [("also", "ignored")].into_iter().collect();
        let seq: Vec<u32> = resolver_for::<Vec<u32>>()
            .resolve(&req, Some(&params))
            .await
            .unwrap();
        assert_eq!(seq, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_sequence_argument_defaults_to_empty() {
        let req = InboundRequest::builder().build();
        let seq: Vec<String> = resolver_for::<Vec<String>>()
            .resolve(&req, None)
            .await
            .unwrap();
        assert!(seq.is_empty());
    }

    #[tokio::test]
    async fn test_form_urlencoded_body() {
        let req = InboundRequest::builder()
            .method(Method::PUT)
            .uri("/?A=1&B=1")
            .header("content-type", "application/x-www-form-urlencoded")
            .body("B=8")
            .build();
        let pair: Pair = resolver_for::<Pair>().resolve(&req, None).await.unwrap();
        assert_eq!(pair, Pair { a: 1, b: 8 });
    }

    #[tokio::test]
    async fn test_body_size_limit() {
        let contract = ArgContract::inspect::<Pair>().unwrap();
        let resolver = ArgumentResolver::new(
            *contract.shape(),
            ResolverConfig {
                max_body_size: 4,
                ..ResolverConfig::default()
            },
        );
        let err = resolver
            .resolve::<Pair>(&post_json("/", r#"{"A": 1}"#), None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "PAYLOAD_TOO_LARGE");
    }

    #[derive(Debug, Serialize, Deserialize, Validate)]
    struct Flat {
        #[validate(range(min = 1, max = 10))]
        n: u8,
        #[serde(flatten)]
        extra: HashMap<String, Value>,
    }

    hermes_core::validated_argument!(Flat);

    fn post_multipart(uri: &str, fields: &[(&str, &str)]) -> InboundRequest {
        const BOUNDARY: &str = "resolver-boundary";
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        InboundRequest::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", &format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(body)
            .build()
    }

    #[tokio::test]
    async fn test_json_content_type_any_case() {
        let req = InboundRequest::builder()
            .method(Method::POST)
            .uri("/")
            .header("content-type", "Application/JSON")
            .body(r#"{"A": 5}"#)
            .build();
        let pair: Pair = resolver_for::<Pair>().resolve(&req, None).await.unwrap();
        assert_eq!(pair.a, 5);
    }

    #[tokio::test]
    async fn test_body_values_are_not_coerced() {
        let resolver = resolver_for::<Pair>();

        let err = resolver
            .resolve::<Pair>(&post_json("/", r#"{"A": "7"}"#), None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DECODE_FAILED");
        assert!(err.to_string().contains("invalid type"));

        let err = resolver
            .resolve::<Pair>(&post_json("/", r#"{"A": [1, 2]}"#), None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DECODE_FAILED");
    }

    #[tokio::test]
    async fn test_keyed_values_coerce_next_to_strict_body() {
        let resolver = resolver_for::<Pair>();

        let pair: Pair = resolver
            .resolve(&post_json("/?A=7", r#"{"B": 2}"#), None)
            .await
            .unwrap();
        assert_eq!(pair, Pair { a: 7, b: 2 });

        // A path value replaces a mistyped body value and is read as text.
        let params: Params = [("A", "8")].into_iter().collect();
        let pair: Pair = resolver
            .resolve(&post_json("/", r#"{"A": "7"}"#), Some(&params))
            .await
            .unwrap();
        assert_eq!(pair.a, 8);

        // A body null leaves the query value in place.
        let pair: Pair = resolver
            .resolve(&post_json("/?A=3", r#"{"A": null}"#), None)
            .await
            .unwrap();
        assert_eq!(pair.a, 3);
    }

    #[tokio::test]
    async fn test_merge_tracks_keyed_keys() {
        let params: Params = [("C", "path")].into_iter().collect();
        let merged = resolver_for::<HashMap<String, Value>>()
            .merge(&post_json("/?A=1&B=2", r#"{"B": 3}"#), Some(&params))
            .await
            .unwrap();

        assert_eq!(merged.value(), &json!({"A": "1", "B": 3, "C": "path"}));
        let keyed: Vec<&str> = merged.keyed_keys().iter().map(String::as_str).collect();
        assert_eq!(keyed, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_flattened_record_is_validated() {
        let resolver = resolver_for::<Flat>();

        let err = resolver
            .resolve::<Flat>(&InboundRequest::builder().uri("/?n=200&x=1").build(), None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");

        let flat: Flat = resolver
            .resolve(&InboundRequest::builder().uri("/?n=2&x=1").build(), None)
            .await
            .unwrap();
        assert_eq!(flat.n, 2);
        assert_eq!(flat.extra["x"], json!("1"));
    }

    #[tokio::test]
    async fn test_multipart_fields_join_query() {
        let req = post_multipart("/?B=9", &[("a", "3")]);
        let pair: Pair = resolver_for::<Pair>().resolve(&req, None).await.unwrap();
        assert_eq!(pair, Pair { a: 3, b: 9 });
    }

    #[tokio::test]
    async fn test_multipart_field_overrides_query_scalar() {
        let req = post_multipart("/?A=1", &[("A", "4")]);
        let pair: Pair = resolver_for::<Pair>().resolve(&req, None).await.unwrap();
        assert_eq!(pair.a, 4);
    }

    #[tokio::test]
    async fn test_path_beats_multipart_fields() {
        let req = post_multipart("/", &[("A", "3"), ("B", "4")]);
        let params: Params = [("a", "6")].into_iter().collect();
        let pair: Pair = resolver_for::<Pair>()
            .resolve(&req, Some(&params))
            .await
            .unwrap();
        assert_eq!(pair, Pair { a: 6, b: 4 });
    }

    #[tokio::test]
    async fn test_multipart_body_is_not_json() {
        let req = post_multipart("/", &[("A", "not a number")]);
        let err = resolver_for::<Pair>()
            .resolve::<Pair>(&req, None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DECODE_FAILED");
    }

    #[test]
    fn test_deep_merge() {
        let mut base = json!({"a": {"x": 1, "y": 2}, "b": [1], "c": "keep"});
        deep_merge(&mut base, json!({"a": {"y": 3}, "b": [2, 3], "d": null}));
        assert_eq!(base, json!({"a": {"x": 1, "y": 3}, "b": [2, 3], "c": "keep", "d": null}));

        let mut base = json!({"a": 1});
        deep_merge(&mut base, Value::Null);
        assert_eq!(base, json!({"a": 1}));

        deep_merge(&mut base, json!([1]));
        assert_eq!(base, json!([1]));
    }

    #[test]
    fn test_rename_prefers_exact_keys() {
        let object = json!({"a": 1, "A": 2}).as_object().cloned().unwrap();
        let renamed = rename_to_fields(object, &["A"]);
        assert_eq!(Value::Object(renamed), json!({"A": 2}));
    }
}
