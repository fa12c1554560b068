//! Property tests for source priority during argument resolution.
//!
//! For any combination of query, body and path values naming the same field,
//! the resolved field must come from the highest-priority source present:
//! path over body over query.

use hermes_core::{ArgContract, Argument, Params};
use hermes_extract::{ArgumentResolver, InboundRequest, ResolverConfig};
use http::Method;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Target {
    value: i64,
    #[serde(default)]
    other: Option<String>,
}

impl Argument for Target {}

fn resolver() -> ArgumentResolver {
    let contract = ArgContract::inspect::<Target>().unwrap();
    ArgumentResolver::new(*contract.shape(), ResolverConfig::default())
}

fn request(query: Option<i64>, body: Option<i64>) -> InboundRequest {
    let uri = match query {
        Some(q) => format!("/target?value={q}"),
        None => "/target".to_string(),
    };
    let mut builder = InboundRequest::builder().method(Method::POST).uri(&uri);
    if let Some(b) = body {
        builder = builder
            .header("content-type", "application/json")
            .body(format!(r#"{{"value": {b}}}"#));
    }
    builder.build()
}

proptest! {
    #[test]
    fn prop_highest_priority_source_wins(
        query in proptest::option::of(any::<i64>()),
        body in proptest::option::of(any::<i64>()),
        path in proptest::option::of(any::<i64>()),
    ) {
        prop_assume!(query.is_some() || body.is_some() || path.is_some());

        let req = request(query, body);
        let params: Option<Params> = path.map(|p| [("value", p.to_string())].into_iter().collect());

        let resolved: Target = tokio_test::block_on(resolver().resolve(&req, params.as_ref()))
            .expect("a value is always present");

        let expected = path.or(body).or(query).unwrap();
        prop_assert_eq!(resolved.value, expected);
    }

    #[test]
    fn prop_field_names_match_in_any_case(
        name in "[vV][aA][lL][uU][eE]",
        value in any::<i32>(),
    ) {
        let req = InboundRequest::builder()
            .uri(&format!("/target?{name}={value}"))
            .build();
        let resolved: Target = tokio_test::block_on(resolver().resolve(&req, None))
            .expect("case-insensitive match");
        prop_assert_eq!(resolved.value, i64::from(value));
    }

    #[test]
    fn prop_unknown_keys_are_ignored(
        key in "[a-z]{1,8}",
        junk in "[a-zA-Z0-9]{0,8}",
    ) {
        prop_assume!(key != "value" && key != "other");

        let req = InboundRequest::builder()
            .uri(&format!("/target?value=1&{key}={junk}"))
            .build();
        let resolved: Target = tokio_test::block_on(resolver().resolve(&req, None))
            .expect("unknown keys never fail resolution");
        prop_assert_eq!(resolved.value, 1);
    }
}
