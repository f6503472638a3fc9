use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins when set; otherwise info for this workspace's crates.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("yield_importer=info,plugwise_client=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
