use moneyflow_assistant::{
    aggregator::FinancialAggregator,
    analytics::AnalyticsService,
    api::{start_server, ApiState},
    chat::ChatOrchestrator,
    gemini::GeminiClient,
    session::SessionStore,
    store::build_store,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
        eprintln!("📌 The assistant will answer with fallback replies only");
        String::new()
    });

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("🚀 MoneyFlow Assistant - API Server");
    info!("📍 Port: {}", api_port);

    // Create components
    let store = build_store();
    let gateway = Arc::new(GeminiClient::new(gemini_api_key));
    let aggregator = FinancialAggregator::new(store.clone());
    let analytics = AnalyticsService::new(store);
    let sessions = SessionStore::new();

    let orchestrator = Arc::new(ChatOrchestrator::new(
        gateway,
        aggregator.clone(),
        sessions,
    ));

    info!("✅ Assistant initialized");
    info!("📡 Starting API server...");

    let state = ApiState {
        orchestrator,
        aggregator,
        analytics,
    };

    // Start API server
    start_server(state, api_port).await?;

    Ok(())
}
