use {
    super::types::REGISTRY,
    crate::error::DashboardError,
    log::{info, warn},
    prometheus::{Encoder, TextEncoder},
    std::net::SocketAddr,
    tokio_util::sync::CancellationToken,
    warp::{http::StatusCode, Filter, Reply},
};

/// Encodes everything in `REGISTRY` in the Prometheus text format.
pub fn render_metrics() -> Result<String, DashboardError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| DashboardError::Unknown(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| DashboardError::Unknown(format!("Metrics are not valid UTF-8: {}", e)))
}

pub struct MetricsExporter {
    addr: SocketAddr,
}

impl MetricsExporter {
    pub fn new(port: u16) -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
        }
    }

    /// Serves `/metrics` until `shutdown` fires.
    pub async fn start(self, shutdown: CancellationToken) -> Result<(), DashboardError> {
        let metrics_route = warp::path!("metrics").map(|| match render_metrics() {
            Ok(body) => {
                warp::reply::with_header(body, "Content-Type", "text/plain; version=0.0.4").into_response()
            }
            Err(e) => {
                warn!("{}", e);
                warp::reply::with_status(e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
            }
        });

        let (addr, server) = warp::serve(metrics_route)
            .try_bind_with_graceful_shutdown(self.addr, async move { shutdown.cancelled().await })
            .map_err(|e| DashboardError::Network(format!("Failed to bind metrics server on {}: {}", self.addr, e)))?;

        info!("Serving metrics on http://{}/metrics", addr);
        server.await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::metrics::types::{register_metrics, POLL_CYCLES_TOTAL}};

    #[test]
    fn test_render_includes_registered_metrics() {
        register_metrics().unwrap();
        POLL_CYCLES_TOTAL.with_label_values(&["success"]).inc();

        let body = render_metrics().unwrap();
        assert!(body.contains("dashboard_poll_cycles_total"));
        assert!(body.contains("outcome=\"success\""));
    }
}
