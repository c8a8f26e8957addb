use std::time::Duration;

use serde::Serialize;

/// Packet delivery statistics for a single run. Counters only ever increase.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct PacketStats {
    pub transmissions_attempted: u64,
    pub transmissions_succeeded: u64,
    pub total_latency: f64,
    /// Latency of every successful transmission, in processing order.
    pub latencies: Vec<f64>,
}

impl PacketStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, latency: f64) {
        self.transmissions_attempted += 1;
        self.transmissions_succeeded += 1;
        self.total_latency += latency;
        self.latencies.push(latency);
    }

    pub fn record_failure(&mut self) {
        self.transmissions_attempted += 1;
    }

    /// Mean latency of successful transmissions, or 0 if there were none.
    pub fn average_latency(&self) -> f64 {
        if self.latencies.is_empty() {
            return 0.0;
        }
        self.total_latency / self.latencies.len() as f64
    }

    /// Fraction of attempted transmissions that found a route, or 0 if nothing was attempted.
    pub fn success_rate(&self) -> f64 {
        if self.transmissions_attempted == 0 {
            return 0.0;
        }
        self.transmissions_succeeded as f64 / self.transmissions_attempted as f64
    }

    /// Fraction of attempted transmissions that failed, or 0 if nothing was attempted.
    pub fn loss_rate(&self) -> f64 {
        if self.transmissions_attempted == 0 {
            return 0.0;
        }
        1.0 - self.success_rate()
    }
}

/// The outcome of one complete run.
#[derive(Serialize, Clone, Debug)]
pub struct RunResult {
    pub run: u32,
    pub seed: u64,
    pub stats: PacketStats,
    #[serde(serialize_with = "serialize_secs")]
    pub wall_time: Duration,
    pub final_nodes: usize,
    pub final_links: usize,
}

impl RunResult {
    /// Wall-clock time spent per injected packet.
    pub fn event_handling_time(&self, packets: u32) -> Duration {
        if packets == 0 {
            return Duration::ZERO;
        }
        self.wall_time / packets
    }

    /// Average simulated latency of delivered packets, or `None` if nothing was delivered.
    pub fn avg_packet_processing_time(&self) -> Option<f64> {
        (self.stats.transmissions_succeeded > 0)
            .then(|| self.stats.total_latency / self.stats.transmissions_succeeded as f64)
    }

    /// Number of packets delivered.
    pub fn throughput(&self) -> u64 {
        self.stats.transmissions_succeeded
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Descriptive statistics of a latency sample.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct LatencySummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 in the denominator). `NaN` for fewer than two samples.
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

impl LatencySummary {
    /// Returns `None` for an empty sample.
    pub fn new(latencies: &[f64]) -> Option<Self> {
        if latencies.is_empty() {
            return None;
        }

        let mut sorted = latencies.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let variance =
                sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            variance.sqrt()
        } else {
            f64::NAN
        };

        Some(Self {
            count,
            mean,
            std,
            min: sorted[0],
            p25: quantile(&sorted, 0.25),
            p50: quantile(&sorted, 0.50),
            p75: quantile(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }
}

/// Linearly interpolated quantile of a sorted, non-empty sample.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Statistics aggregated over every run of a sweep.
#[derive(Serialize, Clone, Debug)]
pub struct SweepStats {
    pub runs: Vec<RunResult>,
    pub packets_per_run: u32,
    pub transmissions_attempted: u64,
    pub transmissions_succeeded: u64,
    pub mean_success_rate: f64,
    pub mean_loss_rate: f64,
    /// Mean of the per-run average latencies, over runs that delivered at least one packet.
    pub mean_latency: Option<f64>,
    /// Summary of every latency recorded in any run.
    pub latency_summary: Option<LatencySummary>,
}

impl SweepStats {
    pub fn new(runs: Vec<RunResult>, packets_per_run: u32) -> Self {
        let mean = |values: &[f64]| {
            (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
        };

        let success_rates: Vec<f64> = runs.iter().map(|r| r.stats.success_rate()).collect();
        let loss_rates: Vec<f64> = runs.iter().map(|r| r.stats.loss_rate()).collect();
        let latencies: Vec<f64> = runs
            .iter()
            .filter_map(|r| r.avg_packet_processing_time())
            .collect();
        let pooled: Vec<f64> = runs
            .iter()
            .flat_map(|r| r.stats.latencies.iter().copied())
            .collect();

        Self {
            packets_per_run,
            transmissions_attempted: runs.iter().map(|r| r.stats.transmissions_attempted).sum(),
            transmissions_succeeded: runs.iter().map(|r| r.stats.transmissions_succeeded).sum(),
            mean_success_rate: mean(&success_rates).unwrap_or(0.0),
            mean_loss_rate: mean(&loss_rates).unwrap_or(0.0),
            mean_latency: mean(&latencies),
            latency_summary: LatencySummary::new(&pooled),
            runs,
        }
    }

    /// Log a human-readable summary of the sweep.
    pub fn log_summary(&self) {
        for run in &self.runs {
            log::debug!(
                "Run {}: attempted={}, succeeded={}, success_rate={:.2}, avg_latency={:.2}, \
                 time_per_packet={:?}, final topology {} nodes/{} links",
                run.run,
                run.stats.transmissions_attempted,
                run.stats.transmissions_succeeded,
                run.stats.success_rate(),
                run.stats.average_latency(),
                run.event_handling_time(self.packets_per_run),
                run.final_nodes,
                run.final_links,
            );
        }

        log::info!(
            "Finished {} runs: attempted={}, succeeded={}, mean success rate={:.2}, \
             mean loss rate={:.2}",
            self.runs.len(),
            self.transmissions_attempted,
            self.transmissions_succeeded,
            self.mean_success_rate,
            self.mean_loss_rate,
        );

        match &self.latency_summary {
            Some(s) => log::info!(
                "Latency distribution: count={} mean={:.3} std={:.3} min={:.3} 25%={:.3} \
                 50%={:.3} 75%={:.3} max={:.3}",
                s.count,
                s.mean,
                s.std,
                s.min,
                s.p25,
                s.p50,
                s.p75,
                s.max
            ),
            None => log::warn!("No packets were delivered in any run"),
        }
    }
}
