use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use answerview::feedback::FeedbackStore;
use answerview::history::HistoryClient;
use answerview::{run_server, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    let history = HistoryClient::new(config.history_base_url.clone());
    let store = FeedbackStore::new();

    run_server(config, store, Arc::new(history)).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
