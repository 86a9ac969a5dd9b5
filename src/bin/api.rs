use std::error::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vn_market_agent::{agent::Orchestrator, api::start_server, config::AgentConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = AgentConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("🚀 Vietnamese Market Agent - API Server");
    info!("📍 Port: {}", config.port);

    if config.llm.api_key.is_empty() {
        warn!("GEMINI_API_KEY not set; planning falls back to keyword rules and answers will fail");
    }
    if config.tools_base_url.is_none() {
        warn!("FINANCIAL_API_BASE_URL not set; tool calls will report failures");
    }

    let orchestrator = Orchestrator::bootstrap(&config)?;

    info!("📡 Starting API server...");
    start_server(orchestrator, &config).await?;

    Ok(())
}
