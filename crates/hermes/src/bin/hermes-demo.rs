//! Hermes demo server.
//!
//! Serves a handful of methods that show every response path of the
//! adapter: plain values, validation failures, method errors, contained
//! panics and methods that write their own response body.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use hermes::prelude::*;
use hermes::{server_config, service_options};
use hermes_config::ConfigError;
use serde_json::Value;

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                    if config.is_none() {
                        eprintln!("--config needs a path");
                        std::process::exit(1);
                    }
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("hermes-demo {}", env!("CARGO_PKG_VERSION"));
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config }
    }
}

fn print_help() {
    println!(
        r#"Hermes demo server

USAGE:
    hermes-demo [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    HERMES__SERVER__HTTP_ADDR               Bind address (default: 0.0.0.0:8080)
    HERMES__SERVICE__MAX_BODY_BYTES         JSON body limit (default: 1048576)
    HERMES__TELEMETRY__LOGGING__LEVEL       Log level (default: info)
    HERMES__TELEMETRY__LOGGING__FORMAT      json or pretty (default: json)
    HERMES__TELEMETRY__METRICS__ENABLED     Serve /metrics (default: true)

ROUTES:
    POST /echo                 returns its arguments
    GET  /add/{{a}}/{{b}}          adds two numbers, rejecting values over 1000000
    GET  /fail?reason=...      fails with the given reason
    GET  /panic                panics inside the method
    GET  /count/{{n}}            streams n lines of plain text

EXAMPLES:
    hermes-demo --config hermes.toml
    curl 'http://localhost:8080/add/2/3'
    curl -d '{{"name":"Ada"}}' -H 'content-type: application/json' http://localhost:8080/echo
"#
    );
}

#[derive(Debug, Serialize, Deserialize, Validate)]
struct Add {
    #[validate(range(min = -1_000_000, max = 1_000_000))]
    a: i64,
    #[validate(range(min = -1_000_000, max = 1_000_000))]
    b: i64,
}

validated_argument!(Add);

#[derive(Debug, Serialize)]
struct Sum {
    a: i64,
    b: i64,
    sum: i64,
}

raw_return!(Sum);

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
struct Fail {
    #[serde(default)]
    reason: Option<String>,
}

validated_argument!(Fail);

#[derive(Debug, Default, Serialize, Deserialize)]
struct Nothing {}

impl Argument for Nothing {}

#[derive(Debug, Serialize, Deserialize, Validate)]
struct Count {
    #[validate(range(max = 100))]
    n: u32,
}

validated_argument!(Count);

#[derive(Debug, thiserror::Error)]
#[error("demo failure: {0}")]
struct DemoError(String);

async fn echo(_ctx: CallContext, args: BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    args
}

async fn add(_ctx: CallContext, args: Add) -> Sum {
    Sum {
        a: args.a,
        b: args.b,
        sum: args.a + args.b,
    }
}

async fn fail(_ctx: CallContext, args: Fail) -> Result<String, DemoError> {
    Err(DemoError(args.reason.unwrap_or_else(|| "no reason given".to_string())))
}

async fn explode(_ctx: CallContext, _args: Nothing) -> String {
    panic!("the demo method panicked on purpose")
}

async fn count(ctx: CallContext, args: Count) {
    let writer = ctx.writer();
    writer.set_header(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    writer.write_header(StatusCode::OK);
    for i in 1..=args.n {
        if ctx.is_cancelled() {
            tracing::debug!(written = i - 1, "count cancelled");
            return;
        }
        writer.write(format!("{i}\n").as_bytes());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Registers every demo route.
fn demo_router(options: &ServiceOptions) -> anyhow::Result<Router> {
    let streaming = options.clone().bypass_response_body(true);
    let mut router = Router::new();

    router
        .add(
            Method::POST,
            "/echo",
            ServiceHandler::builder(echo).name("echo").options(options.clone()).build()?,
        )?
        .add(
            Method::GET,
            "/add/{a}/{b}",
            ServiceHandler::builder(add).name("add").options(options.clone()).build()?,
        )?
        .add(
            Method::GET,
            "/fail",
            ServiceHandler::builder(fail).name("fail").options(options.clone()).build()?,
        )?
        .add(
            Method::GET,
            "/panic",
            ServiceHandler::builder(explode).name("panic").options(options.clone()).build()?,
        )?
        .add(
            Method::GET,
            "/count/{n}",
            ServiceHandler::builder(count).name("count").options(streaming).build()?,
        )?;

    Ok(router)
}

fn load_config(path: Option<&PathBuf>) -> Result<HermesConfig, ConfigError> {
    let loader = ConfigLoader::new().with_dotenv().with_env_prefix("HERMES");
    let loader = match path {
        Some(path) => loader.with_file(path)?,
        None => loader.with_optional_file("hermes.toml")?,
    };
    loader.load()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_ref()).context("failed to load configuration")?;
    init_telemetry(&config.telemetry.to_telemetry_config())
        .context("failed to initialise telemetry")?;

    tracing::info!(
        service = %config.telemetry.service_name,
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.http_addr,
        "Starting Hermes demo"
    );

    let options = service_options(&config)
        .recorder(TracingRecorder::for_service(config.telemetry.service_name.clone()));
    let router = demo_router(&options)?;

    Server::new(server_config(&config), router)
        .run()
        .await
        .context("server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hermes_server::Lookup;

    fn request(method: Method, uri: &str) -> InboundRequest {
        InboundRequest::builder().method(method).uri(uri).build()
    }

    async fn call(router: &Router, req: InboundRequest) -> http::Response<Bytes> {
        let Lookup::Found(found) = router.lookup(req.method(), req.path()) else {
            panic!("no route for {}", req.path());
        };
        let endpoint = std::sync::Arc::clone(found.endpoint());
        endpoint.call(req, found.into_params()).await
    }

    fn json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_add_uses_path_params() {
        let router = demo_router(&ServiceOptions::default()).unwrap();
        let response = call(&router, request(Method::GET, "/add/2/40")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response.body()), serde_json::json!({"a": 2, "b": 40, "sum": 42}));
    }

    #[tokio::test]
    async fn test_add_rejects_out_of_range() {
        let router = demo_router(&ServiceOptions::default()).unwrap();
        let response = call(&router, request(Method::GET, "/add/2/2000000")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_fail_reports_reason() {
        let router = demo_router(&ServiceOptions::default()).unwrap();
        let response = call(&router, request(Method::GET, "/fail?reason=disk%20full")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(response.body())["data"], "demo failure: disk full");
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let router = demo_router(&ServiceOptions::default()).unwrap();
        let response = call(&router, request(Method::GET, "/panic")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(response.body())["msg"], "service method panicked");
    }

    #[tokio::test]
    async fn test_count_writes_its_own_body() {
        let router = demo_router(&ServiceOptions::default()).unwrap();
        let response = call(&router, request(Method::GET, "/count/3")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/plain; charset=utf-8");
        assert_eq!(response.body().as_ref(), b"1\n2\n3\n");
    }

    #[tokio::test]
    async fn test_echo_returns_body_fields() {
        let router = demo_router(&ServiceOptions::default()).unwrap();
        let req = InboundRequest::builder()
            .method(Method::POST)
            .uri("/echo?from=query")
            .header("content-type", "application/json")
            .body(r#"{"name": "Ada", "tags": ["x"]}"#)
            .build();
        let response = call(&router, req).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response.body());
        assert_eq!(body["name"], "Ada");
        assert_eq!(body["tags"], serde_json::json!(["x"]));
        assert_eq!(body["from"], "query");
    }
}
