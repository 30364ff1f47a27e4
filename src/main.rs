//! Proxy Selector - Entry Point
//!
//! Connects to the proxy table, applies filters taken from the environment
//! and prints the connection strings of the selected proxies.

use std::env;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proxy_selector::{Config, Database, ProxySelector, SelectionStrategy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    let json = config.log.format.eq_ignore_ascii_case("json");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("proxy_selector={}", config.log.level).into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    info!("Configuration loaded");

    // Connect to database
    let db = Database::new(&config).await?;
    let latency = db.health_check().await?;
    info!(latency_ms = latency.as_millis() as u64, "Connected to database");

    let source = db.proxy_source(config.fields.clone())?;
    let mut selector = ProxySelector::new(
        Arc::new(source),
        config.fields.clone(),
        config.selector.clone(),
    )?;

    selector
        .set_country_filter(env_list("PROXY_FILTER_COUNTRIES"))
        .set_type_filter(env_codes("PROXY_FILTER_TYPES")?)
        .set_anonymity_filter(env_codes("PROXY_FILTER_ANONYMITY")?);

    if let Some(id) = env_value("PROXY_ID") {
        let id: i64 = id.parse().context("PROXY_ID must be an integer")?;
        selector.by_id(id).await?;
        print_selection(&selector);
    } else {
        let strategy = SelectionStrategy::from_str(&env_value("PROXY_STRATEGY").unwrap_or_default());
        let picks: usize = env_value("PROXY_PICKS")
            .map(|v| v.parse())
            .transpose()
            .context("PROXY_PICKS must be a number")?
            .unwrap_or(1);
        info!(strategy = strategy.as_str(), picks, "Selecting proxies");

        for _ in 0..picks {
            if selector.select(strategy).await?.is_none() {
                warn!("No proxy matches the current filter");
                break;
            }
            print_selection(&selector);
        }
    }

    db.close().await;
    Ok(())
}

fn print_selection(selector: &ProxySelector) {
    match selector.raw() {
        None => warn!("No proxy selected"),
        Some(proxy) => {
            let dsn = selector.connection_string();
            if dsn.is_empty() {
                warn!(id = proxy.id, "Selected proxy has an incorrect format");
            } else {
                println!("{}", dsn);
            }
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Comma-separated list, empty entries dropped
fn env_list(key: &str) -> Vec<String> {
    env_value(key)
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn env_codes(key: &str) -> anyhow::Result<Vec<i64>> {
    env_list(key)
        .iter()
        .map(|code| {
            code.parse()
                .with_context(|| format!("{} must hold comma-separated integer codes", key))
        })
        .collect()
}
