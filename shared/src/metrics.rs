//! Prometheus metrics bootstrap (spec §6 ambient stack): one `Registry`
//! created at startup and handed to `serve_metrics`, mirroring the
//! teacher's `shared::metrics::serve_metrics` as called from
//! `solver/src/main.rs`.

use prometheus::{Encoder as _, Registry, TextEncoder};
use std::net::SocketAddr;
use warp::Filter;

/// Serves `/metrics` off `registry` until the process exits. Matches the
/// teacher's fire-and-forget `tokio::spawn(serve_metrics(...))` usage in
/// `main`.
pub async fn serve_metrics(registry: Registry, address: SocketAddr) {
    let filter = warp::path("metrics").map(move || {
        let families = registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .expect("prometheus text encoding never fails for well-formed metrics");
        warp::http::Response::builder()
            .header("content-type", "text/plain; version=0.0.4")
            .body(buffer)
    });
    warp::serve(filter).run(address).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{IntCounter, Registry};

    #[test]
    fn registered_counter_is_gathered() {
        let registry = Registry::new();
        let counter = IntCounter::new("rounds_total", "rounds processed").unwrap();
        registry.register(Box::new(counter.clone())).unwrap();
        counter.inc();
        let families = registry.gather();
        assert!(families.iter().any(|f| f.get_name() == "rounds_total"));
    }
}
