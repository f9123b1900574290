//! Structured logging setup (spec §6 ambient stack), grounded on the
//! teacher's `shared::tracing::initialize` entry point: a `tracing_subscriber`
//! `fmt` layer driven by an `EnvFilter`, defaulting to the `--log-filter`
//! argument but always overridable by the `RUST_LOG` environment variable.

pub fn initialize(filter: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();
}
