//! Server liveness collector.

use async_trait::async_trait;
use tracing::debug;

use super::{Collector, CollectorError, MetricDesc, MetricSample};
use crate::parse;
use crate::rcon::Transport;

const SYSTEM_UP: MetricDesc = MetricDesc {
    name: "minecraft_up",
    help: "Minecraft server up.",
    labels: &[],
};

/// Probes the server with `help`, the cheapest command that always answers.
/// Transport failures are folded into the gauge value, so this collector's
/// update never fails.
pub struct SystemCollector;

#[async_trait]
impl Collector for SystemCollector {
    async fn update(&self, transport: &dyn Transport) -> Result<Vec<MetricSample>, CollectorError> {
        let reply = transport.execute("help").await;
        let up = !reply.is_error && parse::parse_liveness(&reply.text);
        debug!(up, "server liveness probe");

        Ok(vec![MetricSample::new(
            SYSTEM_UP,
            Vec::new(),
            if up { 1.0 } else { 0.0 },
        )])
    }
}
