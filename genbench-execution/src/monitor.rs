//! Concurrent host resource sampling
//!
//! The monitor samples the whole host rather than one pid: the tool may
//! fork further processes (JVMs, containers) that are not known up front.

use genbench_core::record::round_to;
use genbench_core::ResourceSummary;
use std::time::Duration;
use sysinfo::System;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One reading of host CPU and memory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

/// Source of resource readings
pub trait ResourceProbe: Send + 'static {
    fn sample(&mut self) -> ResourceSample;
}

/// Probe backed by `sysinfo`
pub struct SystemProbe {
    system: System,
}

impl SystemProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        // CPU usage is a delta; prime it so the first real sample has a baseline
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self { system }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProbe for SystemProbe {
    fn sample(&mut self) -> ResourceSample {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        ResourceSample {
            cpu_percent: self.system.global_cpu_usage() as f64,
            memory_mb: self.system.used_memory() as f64 / BYTES_PER_MB,
        }
    }
}

/// Samples collected over one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSamples {
    pub samples: Vec<ResourceSample>,
}

impl ResourceSamples {
    /// Mean CPU over non-zero samples and peak memory; zeros when empty
    pub fn summary(&self) -> ResourceSummary {
        let cpu: Vec<f64> = self
            .samples
            .iter()
            .map(|s| s.cpu_percent)
            .filter(|v| v.is_finite() && *v > 0.0)
            .collect();
        let cpu_average_percent = if cpu.is_empty() {
            0.0
        } else {
            cpu.iter().sum::<f64>() / cpu.len() as f64
        };

        let memory_peak_mb = self
            .samples
            .iter()
            .map(|s| s.memory_mb)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .fold(0.0_f64, f64::max);

        ResourceSummary {
            cpu_average_percent: round_to(cpu_average_percent, 2),
            memory_peak_mb: round_to(memory_peak_mb, 2),
            samples: self.samples.len(),
        }
    }
}

/// Starts sampling tasks
pub struct ResourceMonitor;

impl ResourceMonitor {
    /// Start sampling every `poll_interval` until the handle is stopped
    pub fn start<P: ResourceProbe>(probe: P, poll_interval: Duration) -> MonitorHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(sample_loop(probe, poll_interval, stop_rx));
        MonitorHandle {
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }

    /// A handle that yields no samples, for runs with monitoring disabled
    pub fn disabled() -> MonitorHandle {
        MonitorHandle {
            stop_tx: None,
            task: None,
        }
    }
}

async fn sample_loop<P: ResourceProbe>(
    mut probe: P,
    poll_interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) -> ResourceSamples {
    let mut samples = Vec::new();
    // No tick at t=0: a CPU reading straight after priming has no usable delta
    let mut ticker = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => {
                // Final flush before reporting
                samples.push(probe.sample());
                break;
            }
            _ = ticker.tick() => {
                let sample = probe.sample();
                trace!(
                    cpu_percent = sample.cpu_percent,
                    memory_mb = sample.memory_mb,
                    "Resource sample"
                );
                samples.push(sample);
            }
        }
    }

    ResourceSamples { samples }
}

/// Handle to a running monitor
pub struct MonitorHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<ResourceSamples>>,
}

impl MonitorHandle {
    /// Signal the sampler, wait for its final sample and return everything
    pub async fn stop(mut self) -> ResourceSamples {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The task may already be gone; its samples are still in the join handle
            let _ = stop_tx.send(());
        }

        match self.task.take() {
            Some(task) => match task.await {
                Ok(samples) => {
                    debug!("Resource monitor stopped after {} samples", samples.samples.len());
                    samples
                }
                Err(e) => {
                    warn!("Resource monitor task failed: {}", e);
                    ResourceSamples::default()
                }
            },
            None => ResourceSamples::default(),
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedProbe {
        readings: Vec<ResourceSample>,
        calls: Arc<AtomicUsize>,
    }

    impl ResourceProbe for ScriptedProbe {
        fn sample(&mut self) -> ResourceSample {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            self.readings
                .get(index)
                .copied()
                .unwrap_or(ResourceSample {
                    cpu_percent: 0.0,
                    memory_mb: 0.0,
                })
        }
    }

    fn sample(cpu_percent: f64, memory_mb: f64) -> ResourceSample {
        ResourceSample {
            cpu_percent,
            memory_mb,
        }
    }

    #[test]
    fn test_empty_samples_summarise_to_zero() {
        let summary = ResourceSamples::default().summary();
        assert_eq!(summary.cpu_average_percent, 0.0);
        assert_eq!(summary.memory_peak_mb, 0.0);
        assert_eq!(summary.samples, 0);
    }

    #[test]
    fn test_mean_ignores_zero_and_invalid_cpu() {
        let samples = ResourceSamples {
            samples: vec![
                sample(0.0, 100.0),
                sample(40.0, 300.5),
                sample(f64::NAN, 250.0),
                sample(-3.0, f64::INFINITY),
                sample(60.0, 200.0),
            ],
        };
        let summary = samples.summary();
        assert_eq!(summary.cpu_average_percent, 50.0);
        assert_eq!(summary.memory_peak_mb, 300.5);
        assert_eq!(summary.samples, 5);
        assert!(!summary.cpu_average_percent.is_nan());
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_takes_final_sample_on_stop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = ScriptedProbe {
            readings: vec![sample(10.0, 100.0), sample(20.0, 150.0), sample(30.0, 120.0)],
            calls: Arc::clone(&calls),
        };

        let handle = ResourceMonitor::start(probe, Duration::from_secs(5));
        // Ticks at 5s and 10s
        tokio::time::sleep(Duration::from_secs(11)).await;
        let samples = handle.stop().await;

        assert_eq!(samples.samples.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let summary = samples.summary();
        assert_eq!(summary.cpu_average_percent, 20.0);
        assert_eq!(summary.memory_peak_mb, 150.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sample_waits_one_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = ScriptedProbe {
            readings: vec![sample(55.0, 400.0)],
            calls: Arc::clone(&calls),
        };

        let handle = ResourceMonitor::start(probe, Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // Only the final flush
        let samples = handle.stop().await;
        assert_eq!(samples.samples, vec![sample(55.0, 400.0)]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_monitor_yields_nothing() {
        let samples = ResourceMonitor::disabled().stop().await;
        assert!(samples.samples.is_empty());
    }

    #[tokio::test]
    async fn test_system_probe_reports_sane_values() {
        let mut probe = SystemProbe::new();
        let reading = probe.sample();
        assert!(reading.cpu_percent >= 0.0);
        assert!(reading.memory_mb > 0.0);
    }
}
