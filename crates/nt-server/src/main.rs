mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use nt_api::auth::{AppState, AppStateInner};
use nt_api::checkout::CheckoutDesk;
use nt_api::verification::CodeDesk;
use nt_genai::GeminiClient;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "numbertag=debug,nt_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = nt_db::Database::open(&config.db_path)?;

    let model = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.genai_model.clone(),
        config.genai_base_url.clone(),
        config.genai_timeout,
    )?;
    if !model.is_configured() {
        warn!("GEMINI_API_KEY is not set; synthesis and scout will serve fallbacks");
    }
    if config.demo_codes {
        warn!("Demo mode: verification codes are echoed to clients");
    }

    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        admin_user: config.admin_user.clone(),
        admin_password: config.admin_password.clone(),
        model: Arc::new(model),
        genai_deadline: config.genai_timeout,
        codes: CodeDesk::default(),
        checkout: CheckoutDesk::new(config.paystack_public_key.clone()),
        demo_codes: config.demo_codes,
    });

    let mut app = nt_api::router(app_state);
    if let Some(dir) = &config.static_dir {
        info!("Serving frontend from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }
    let app = app
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Number Tag node listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
