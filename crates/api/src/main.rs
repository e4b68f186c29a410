use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockbot_core::bot::{Dispatcher, InboundMessage};
use stockbot_core::config::Settings;
use stockbot_core::conversation::ConversationTracker;
use stockbot_core::directory::StockMatcher;
use stockbot_core::market::HttpMarketDataProvider;
use stockbot_core::messaging::{strip_channel_scheme, TwilioMessenger};
use stockbot_core::storage::{PgStockDirectory, PgUserStore};
use stockbot_core::{replies, BotError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match stockbot_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    let dispatcher = match pool {
        Some(pool) => match build_dispatcher(&settings, pool) {
            Ok(d) => Some(Arc::new(d)),
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %e, "collaborator config incomplete; starting API in degraded mode");
                None
            }
        },
        None => None,
    };

    let app = router(AppState { dispatcher });

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_dispatcher(settings: &Settings, pool: PgPool) -> anyhow::Result<Dispatcher> {
    let market = HttpMarketDataProvider::from_settings(settings)?;
    let messenger = TwilioMessenger::from_settings(settings)?;

    Ok(Dispatcher::new(
        StockMatcher::new(Arc::new(PgStockDirectory::new(pool.clone()))),
        ConversationTracker::new(Arc::new(PgUserStore::new(pool))),
        Arc::new(market),
        Arc::new(messenger),
        settings.market_symbol_suffix.clone(),
    ))
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/whatsapp", post(whatsapp_webhook))
        .route("/alert", get(alert_placeholder))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    dispatcher: Option<Arc<Dispatcher>>,
}

/// Twilio's inbound WhatsApp webhook form. Only `From` and `Body` drive behaviour.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TwilioWebhookPayload {
    from: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    message_sid: Option<String>,
    #[serde(default)]
    sms_sid: Option<String>,
    #[serde(default)]
    sms_message_sid: Option<String>,
    #[serde(default)]
    account_sid: Option<String>,
    #[serde(default)]
    messaging_service_sid: Option<String>,
}

impl TwilioWebhookPayload {
    fn into_inbound(self) -> Result<InboundMessage, BotError> {
        let phone = strip_channel_scheme(&self.from);
        if phone.is_empty() {
            return Err(BotError::MalformedPayload("missing sender".to_string()));
        }
        Ok(InboundMessage {
            phone: phone.to_string(),
            body: self.body,
        })
    }
}

async fn whatsapp_webhook(
    State(state): State<AppState>,
    payload: Result<Form<TwilioWebhookPayload>, FormRejection>,
) -> Response {
    let Form(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return error_response(&BotError::MalformedPayload(rejection.body_text()));
        }
    };

    tracing::info!(
        from = %payload.from,
        to = ?payload.to,
        message_sid = ?payload.message_sid,
        sms_sid = ?payload.sms_sid,
        sms_message_sid = ?payload.sms_message_sid,
        account_sid = ?payload.account_sid,
        messaging_service_sid = ?payload.messaging_service_sid,
        "inbound whatsapp message"
    );

    let message = match payload.into_inbound() {
        Ok(m) => m,
        Err(e) => return error_response(&e),
    };

    let Some(dispatcher) = &state.dispatcher else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "service unavailable", "status": 503})),
        )
            .into_response();
    };

    match dispatcher.handle(message).await {
        Ok(outcome) => Json(json!({
            "status": "ok",
            "intent": outcome.intent,
            "message_sid": outcome.receipt.map(|r| r.sid),
            "spawned_alerts": outcome.spawned_alerts,
        }))
        .into_response(),
        Err(err) => error_response(&err),
    }
}

async fn alert_placeholder() -> Json<serde_json::Value> {
    Json(json!({
        "status": "😁",
        "message": replies::ALERT_UNDER_CONSTRUCTION,
    }))
}

fn status_for(err: &BotError) -> StatusCode {
    match err {
        BotError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
        BotError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        BotError::UpstreamUnavailable(_)
        | BotError::SymbolNotFound(_)
        | BotError::Delivery(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: &BotError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        sentry::capture_error(err);
        tracing::error!(error = %err, %status, "webhook failed");
    } else {
        tracing::warn!(error = %err, %status, "webhook rejected");
    }

    (
        status,
        Json(json!({"error": err.to_string(), "status": status.as_u16()})),
    )
        .into_response()
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
