use tracing_subscriber::EnvFilter;

/// Install the JSON log subscriber. Level comes from `RUST_LOG`, default `info`.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();
}
