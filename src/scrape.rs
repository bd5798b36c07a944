//! Per-scrape orchestration and exposition encoding.
//!
//! One scrape resolves the active collector set, runs each collector's
//! update sequentially, and renders whatever succeeded. A failing collector
//! shows up as missing series plus a zero success marker, never as a failed
//! HTTP response or a crashed process.

use std::collections::HashMap;
use std::time::Instant;

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tracing::{debug, warn};

use crate::collector::{CollectorRegistry, FilterError, MetricDesc, MetricSample};
use crate::rcon::Transport;

const SCRAPE_SUCCESS: MetricDesc = MetricDesc {
    name: "minecraft_scrape_collector_success",
    help: "Whether the collector succeeded for this scrape.",
    labels: &["collector"],
};

const SCRAPE_DURATION: MetricDesc = MetricDesc {
    name: "minecraft_scrape_collector_duration_seconds",
    help: "Time the collector spent for this scrape.",
    labels: &["collector"],
};

/// Run one scrape and return the exposition-format body.
///
/// `Err` only for request-level filter problems (the HTTP layer's 400);
/// collector failures are absorbed into the body.
pub async fn run_scrape(
    registry: &CollectorRegistry,
    transport: &dyn Transport,
    include: &[String],
    exclude: &[String],
) -> Result<String, FilterError> {
    let active = registry.active_set(include, exclude)?;

    let mut samples = Vec::new();
    for registration in active {
        let started = Instant::now();
        let result = registration.collector.update(transport).await;
        let duration = started.elapsed();

        let success = match result {
            Ok(mut emitted) => {
                debug!(
                    collector = registration.name,
                    samples = emitted.len(),
                    "collector succeeded"
                );
                samples.append(&mut emitted);
                1.0
            }
            Err(e) => {
                warn!(
                    collector = registration.name,
                    error = %e,
                    "collector failed, omitting its series for this scrape"
                );
                0.0
            }
        };

        let name = registration.name.to_string();
        samples.push(MetricSample::new(SCRAPE_SUCCESS, vec![name.clone()], success));
        samples.push(MetricSample::new(
            SCRAPE_DURATION,
            vec![name],
            duration.as_secs_f64(),
        ));
    }

    Ok(encode_samples(&samples))
}

/// Render samples through a fresh prometheus registry. The registry lives
/// for one scrape only, so values never leak between scrapes.
fn encode_samples(samples: &[MetricSample]) -> String {
    let registry = Registry::new();
    let mut families: HashMap<&'static str, GaugeVec> = HashMap::new();

    for sample in samples {
        let gauge = families.entry(sample.desc.name).or_insert_with(|| {
            let gauge = GaugeVec::new(
                Opts::new(sample.desc.name, sample.desc.help),
                sample.desc.labels,
            )
            .expect("static metric descriptor");
            registry
                .register(Box::new(gauge.clone()))
                .expect("descriptor registered once");
            gauge
        });

        let values: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
        gauge.with_label_values(&values).set(sample.value);
    }

    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buf)
        .expect("text encoding into a Vec cannot fail");
    String::from_utf8(buf).unwrap_or_default()
}
