use std::sync::Arc;

use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::middleware::from_fn;
use actix_web::{get, web, App, HttpResponse, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tollgate::{
    EventBus, Facilitator, LocalFacilitator, RemoteFacilitator, DEFAULT_ASSET,
    DEFAULT_ASSET_DECIMALS, DEFAULT_NETWORK,
};
use tollgate_server::middleware::{payment_gate, VerifiedPayment};
use tollgate_server::{routes, GateConfig, GatewayState, RouteTable};

fn build_cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        // Default: allow localhost on any port
        Cors::default()
            .allowed_origin_fn(|origin, _| {
                origin
                    .to_str()
                    .map(|o| o == "http://localhost" || o.starts_with("http://localhost:"))
                    .unwrap_or(false)
            })
            .allow_any_method()
            .allow_any_header()
            .max_age(3600)
    } else {
        let mut cors = Cors::default();
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
        cors.allow_any_method().allow_any_header().max_age(3600)
    }
}

fn build_facilitator() -> Arc<dyn Facilitator> {
    let hmac_secret = std::env::var("FACILITATOR_SHARED_SECRET")
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| s.into_bytes());

    match std::env::var("FACILITATOR_URL").ok().filter(|s| !s.is_empty()) {
        Some(url) => {
            tracing::info!(url = %url, "facilitator: remote");
            let mut facilitator = RemoteFacilitator::new(&url);
            if let Some(secret) = hmac_secret {
                facilitator = facilitator.with_hmac_secret(secret);
            } else {
                tracing::warn!(
                    "FACILITATOR_SHARED_SECRET not set — facilitator requests will be unsigned"
                );
            }
            Arc::new(facilitator)
        }
        None => {
            tracing::warn!(
                "FACILITATOR_URL not set — using the in-process local facilitator. \
                 It does no real verification; do not use this in production."
            );
            Arc::new(LocalFacilitator::new())
        }
    }
}

/// Demo priced resource. Anything that reaches this handler has already
/// been verified by the payment gate.
#[get("/weather")]
async fn weather(payment: Option<web::ReqData<VerifiedPayment>>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "location": "Lisbon",
        "tempC": 21,
        "conditions": "clear",
        "paidBy": payment.as_ref().and_then(|p| p.payer.clone()),
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(4021);

    let pay_to = std::env::var("PAY_TO").unwrap_or_else(|_| {
        tracing::warn!("PAY_TO not set — using a placeholder payee address");
        "0x0000000000000000000000000000000000000000".to_string()
    });
    let network = std::env::var("NETWORK").unwrap_or_else(|_| DEFAULT_NETWORK.to_string());
    let asset = std::env::var("ASSET").unwrap_or_else(|_| DEFAULT_ASSET.to_string());

    let routes_table = RouteTable::builder(&pay_to)
        .network(&network)
        .asset(&asset, DEFAULT_ASSET_DECIMALS)
        .route("GET", "/weather", 100, Some("Current weather snapshot"))
        .build()
        .expect("invalid route table");

    let config = GateConfig::from_env();
    let cors_origins = config.allowed_origins.clone();
    let rate_limit_rpm = config.rate_limit_rpm;

    let state = web::Data::new(GatewayState::new(
        routes_table,
        build_facilitator(),
        Arc::new(EventBus::new()),
        config,
    ));

    tracing::info!("tollgate server listening at http://localhost:{port}");
    tracing::info!("priced: GET /weather — free: GET /events, GET /health, GET /metrics");
    tracing::info!("rate limit: {rate_limit_rpm} req/min per IP");

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm)
        .finish()
        .expect("failed to build rate limiter config");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(from_fn(payment_gate))
            .wrap(build_cors(&cors_origins))
            .wrap(Governor::new(&governor_conf))
            .service(routes::events)
            .service(routes::health)
            .service(routes::metrics_endpoint)
            .service(weather)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
