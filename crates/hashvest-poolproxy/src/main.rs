//! Hashvest Pool Proxy
//!
//! Thin authenticated proxy in front of the F2Pool v2 API so dashboards
//! never see the account API secret. Exposes read-only hashrate, worker,
//! and earnings endpoints behind a CORS origin allowlist.

use axum::{
    extract::{Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SECRET_HEADER: &str = "F2P-API-SECRET";

#[derive(Parser)]
#[command(name = "hashvest-poolproxy")]
#[command(version = "0.1.0")]
#[command(about = "Authenticated mining-pool API proxy", long_about = None)]
struct Cli {
    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:8791")]
    listen: String,

    /// Upstream pool API base URL
    #[arg(long, default_value = "https://api.f2pool.com/v2")]
    upstream: String,

    /// Pool API secret
    #[arg(long, env = "POOL_API_SECRET", hide_env_values = true)]
    api_secret: Option<String>,

    /// Allowed browser origins (repeatable)
    #[arg(long = "allow-origin", default_values_t = vec![
        "https://dashboard.ionmining.example".to_string(),
        "http://localhost".to_string(),
        "http://127.0.0.1".to_string(),
    ])]
    allow_origins: Vec<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

struct AppState {
    http: reqwest::Client,
    upstream: String,
    api_secret: Option<String>,
}

#[derive(Deserialize)]
struct UserQuery {
    user: Option<String>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .user_agent("hashvest-poolproxy/0.1")
        .build()
        .expect("reqwest client construction cannot fail with static options");

    let state = Arc::new(AppState {
        http,
        upstream: cli.upstream.trim_end_matches('/').to_string(),
        api_secret: cli.api_secret,
    });

    let mut origins = Vec::new();
    for origin in &cli.allow_origins {
        match origin.parse::<HeaderValue>() {
            Ok(value) => origins.push(value),
            Err(_) => tracing::warn!(%origin, "skipping unparseable allow-origin"),
        }
    }
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(AllowOrigin::list(origins));

    let app = Router::new()
        .route("/hashrate", get(hashrate))
        .route("/workers", get(workers))
        .route("/earnings", get(earnings))
        .route("/ping", get(ping))
        .layer(cors)
        .with_state(state);

    tracing::info!(listen = %cli.listen, "pool proxy listening");
    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn hashrate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> (StatusCode, Json<Value>) {
    relay(&state, query, "/hash_rate/info", |user| {
        json!({ "currency": "bitcoin", "mining_user_name": user })
    })
    .await
}

async fn workers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> (StatusCode, Json<Value>) {
    relay(&state, query, "/hash_rate/worker/list", |user| {
        json!({
            "currency": "bitcoin",
            "mining_user_name": user,
            "page": 1,
            "page_size": 100,
            "status": "all",
            "order_by": "worker_name",
        })
    })
    .await
}

async fn earnings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> (StatusCode, Json<Value>) {
    relay(&state, query, "/assets/balance", |user| {
        json!({ "currency": "bitcoin", "mining_user_name": user })
    })
    .await
}

/// Health check: verifies the secret against the upstream without
/// relaying the account payload back.
async fn ping(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> (StatusCode, Json<Value>) {
    let (status, _) = relay(&state, query, "/hash_rate/info", |user| {
        json!({ "currency": "bitcoin", "mining_user_name": user })
    })
    .await;
    if status == StatusCode::OK {
        (StatusCode::OK, Json(json!({ "ok": true })))
    } else {
        (status, Json(json!({ "ok": false })))
    }
}

/// Forward one authenticated upstream call, mapping failures to JSON
/// error bodies the dashboard can show.
async fn relay(
    state: &AppState,
    query: UserQuery,
    endpoint: &str,
    body: impl FnOnce(&str) -> Value,
) -> (StatusCode, Json<Value>) {
    let Some(user) = query.user.filter(|u| !u.is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "Missing user parameter");
    };
    let Some(secret) = state.api_secret.as_deref() else {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "API secret not configured");
    };

    let url = format!("{}{}", state.upstream, endpoint);
    let result = state
        .http
        .post(&url)
        .header(SECRET_HEADER, secret)
        .json(&body(&user))
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => match response.json::<Value>().await {
            Ok(payload) => (StatusCode::OK, Json(payload)),
            Err(e) => {
                tracing::warn!(endpoint, error = %e, "upstream returned non-JSON payload");
                error(StatusCode::BAD_GATEWAY, "Upstream returned invalid payload")
            }
        },
        Ok(response) => {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(endpoint, %status, "upstream pool API error");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": format!("Pool API error {status}: {text}") })),
            )
        }
        Err(e) => {
            tracing::warn!(endpoint, error = %e, "upstream pool API unreachable");
            error(StatusCode::BAD_GATEWAY, "Pool API unreachable")
        }
    }
}

fn error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}
