use std::future::Future;
use std::time::Duration;

use rand::Rng;
use time::OffsetDateTime;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::payload::LogGenerator;
use crate::sink::LogSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub interval: Duration,
    pub batch_size: usize,
    pub max_records: Option<u64>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub sent: u64,
    pub failed: u64,
}

impl RunStats {
    fn attempted(&self) -> u64 {
        self.sent + self.failed
    }
}

/// Sends `batch_size` records per tick until `shutdown` resolves or
/// `max_records` records were attempted. Sink failures are logged and
/// counted, never fatal. A send still in flight at shutdown is abandoned.
pub async fn run<R, S, F>(
    generator: &mut LogGenerator<R>,
    sink: &S,
    options: RunOptions,
    shutdown: F,
) -> RunStats
where
    R: Rng,
    S: LogSink + ?Sized,
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut stats = RunStats::default();
    'ticks: loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        for _ in 0..options.batch_size {
            if options.max_records.is_some_and(|max| stats.attempted() >= max) {
                break 'ticks;
            }

            let record = generator.next_record(OffsetDateTime::now_utc());
            let outcome = tokio::select! {
                _ = &mut shutdown => break 'ticks,
                outcome = sink.send(&record) => outcome,
            };
            match outcome {
                Ok(()) => stats.sent += 1,
                Err(err) => {
                    stats.failed += 1;
                    warn!("failed to send {} record: {}", record.level, err);
                }
            }
        }
    }

    info!(sent = stats.sent, failed = stats.failed, "generator stopped");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::SyntheticLog;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemorySink {
        records: Arc<Mutex<Vec<SyntheticLog>>>,
    }

    impl MemorySink {
        fn len(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LogSink for MemorySink {
        async fn send(&self, record: &SyntheticLog) -> anyhow::Result<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl LogSink for FailingSink {
        async fn send(&self, _record: &SyntheticLog) -> anyhow::Result<()> {
            Err(anyhow!("ingestion endpoint unavailable"))
        }
    }

    struct StalledSink;

    #[async_trait]
    impl LogSink for StalledSink {
        async fn send(&self, _record: &SyntheticLog) -> anyhow::Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn generator() -> LogGenerator {
        LogGenerator::with_rng("test", StdRng::seed_from_u64(11))
    }

    fn options(batch_size: usize, max_records: Option<u64>) -> RunOptions {
        RunOptions {
            interval: Duration::from_millis(1),
            batch_size,
            max_records,
        }
    }

    #[tokio::test]
    async fn stops_after_max_records() {
        let sink = MemorySink::default();
        let stats = run(
            &mut generator(),
            &sink,
            options(3, Some(10)),
            std::future::pending(),
        )
        .await;

        assert_eq!(stats, RunStats { sent: 10, failed: 0 });
        assert_eq!(sink.len(), 10);
    }

    #[tokio::test]
    async fn failures_are_counted_not_fatal() {
        let stats = run(
            &mut generator(),
            &FailingSink,
            options(1, Some(4)),
            std::future::pending(),
        )
        .await;

        assert_eq!(stats, RunStats { sent: 0, failed: 4 });
    }

    #[tokio::test]
    async fn stops_on_shutdown() {
        let sink = MemorySink::default();
        let stats = run(
            &mut generator(),
            &sink,
            options(1, None),
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await;

        assert_eq!(stats.failed, 0);
        assert_eq!(stats.sent as usize, sink.len());
    }

    #[tokio::test]
    async fn shutdown_interrupts_a_slow_batch() {
        let stats = tokio::time::timeout(
            Duration::from_secs(5),
            run(
                &mut generator(),
                &StalledSink,
                options(10, None),
                tokio::time::sleep(Duration::from_millis(20)),
            ),
        )
        .await
        .expect("shutdown should interrupt the in-flight send");

        assert_eq!(stats, RunStats { sent: 0, failed: 0 });
    }
}
