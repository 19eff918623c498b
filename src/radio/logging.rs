use std::env;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Picks the log filter. A valid `rust_log` wins over the per-environment
/// defaults.
pub fn select_filter(env: &str, rust_log: Option<&str>) -> EnvFilter {
    if let Some(directives) = rust_log
        && let Ok(filter) = EnvFilter::try_new(directives)
    {
        return filter;
    }

    match env {
        "production" => EnvFilter::new("info,waveradio=debug"),
        "development" => EnvFilter::new("debug,hyper=info,tungstenite=info"),
        _ => EnvFilter::new("info"),
    }
}

pub fn init_logging() {
    let env = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    let rust_log = env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = select_filter(&env, rust_log.as_deref());

    let format: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = match env.as_str() {
        "production" => Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_thread_ids(true)
                .with_target(true),
        ),
        _ => Box::new(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true),
        ),
    };

    // try_init so a second call (tests, embedding) does not panic
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .try_init();
}
