//! Sequential batches, concurrent items.
//!
//! # Data Flow
//! ```text
//! items
//!     → chunks of batch_size (strictly one after another)
//!     → every item of the chunk settles concurrently:
//!           rejected secret       → failed record, no network
//!           resolve with retries  → balance | validation error | retries exhausted
//!     → merge into the accumulated RecordSet (last-write-wins)
//!     → on_batch(report) before the next chunk starts
//! ```
//!
//! Peak outbound requests never exceed `batch_size`.

use futures_util::future::join_all;
use std::sync::Arc;

use crate::blockchain::{BalanceResolver, ResolveError};
use crate::config::SchedulerConfig;
use crate::lifecycle::CancelSignal;
use crate::observability::metrics;
use crate::resilience::{retry_with_backoff, RetryOutcome, RetryPolicy};
use crate::scanner::types::{RecordSet, ScanItem, WalletRecord, CANCELLED, FETCH_FAILED};

/// Emitted once per settled batch, in submission order.
#[derive(Debug)]
pub struct BatchReport<'a> {
    pub batch_index: usize,
    /// Records settled by this batch.
    pub batch: &'a [WalletRecord],
    /// Everything settled so far, merged by address.
    pub accumulated: &'a RecordSet,
    pub completed: usize,
    pub total: usize,
}

impl BatchReport<'_> {
    pub fn progress(&self) -> u8 {
        percent(self.completed, self.total)
    }
}

pub(crate) fn percent(done: usize, total: usize) -> u8 {
    if total == 0 || done >= total {
        100
    } else {
        (done as u128 * 100 / total as u128) as u8
    }
}

/// Drives a scan run against one resolver.
#[derive(Debug)]
pub struct BatchScheduler {
    resolver: Arc<BalanceResolver>,
    batch_size: usize,
    policy: RetryPolicy,
}

impl BatchScheduler {
    pub fn new(resolver: Arc<BalanceResolver>, batch_size: usize, policy: RetryPolicy) -> Self {
        Self {
            resolver,
            batch_size: batch_size.max(1),
            policy,
        }
    }

    pub fn from_config(resolver: Arc<BalanceResolver>, config: &SchedulerConfig) -> Self {
        Self::new(resolver, config.batch_size, RetryPolicy::from_config(config))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Resolve every item, reporting after each batch.
    ///
    /// Returns the merged records of every batch that ran. Batches not yet
    /// started when `cancel` fires are skipped and never reported.
    pub async fn run<F>(&self, items: Vec<ScanItem>, cancel: &CancelSignal, mut on_batch: F) -> RecordSet
    where
        F: FnMut(BatchReport<'_>),
    {
        let total = items.len();
        let mut accumulated = RecordSet::new();
        let mut completed = 0;

        for (batch_index, batch) in items.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(batch = batch_index, completed, total, "Run cancelled, skipping remaining batches");
                break;
            }

            let settled = join_all(batch.iter().map(|item| self.settle(item, cancel))).await;
            completed += settled.len();
            accumulated.merge(settled.iter().cloned());

            tracing::debug!(batch = batch_index, completed, total, "Batch settled");
            on_batch(BatchReport {
                batch_index,
                batch: &settled,
                accumulated: &accumulated,
                completed,
                total,
            });
        }

        accumulated
    }

    /// Drive one item to a checked record.
    async fn settle(&self, item: &ScanItem, cancel: &CancelSignal) -> WalletRecord {
        let key = item.key();
        let address = match item {
            ScanItem::Address(address) => address.as_str(),
            ScanItem::RejectedSecret { .. } => {
                metrics::record_item_settled("invalid");
                let reason = item.rejection().map(|e| e.to_string()).unwrap_or_default();
                return WalletRecord::failed(key, reason);
            }
        };

        let outcome = retry_with_backoff(
            &self.policy,
            cancel,
            || self.resolver.resolve(address),
            ResolveError::is_retryable,
        )
        .await;

        match outcome {
            RetryOutcome::Succeeded { value, .. } => {
                metrics::record_item_settled("balance");
                WalletRecord::resolved(key, value)
            }
            RetryOutcome::Failed {
                error: ResolveError::Validation(e),
                ..
            } => {
                metrics::record_item_settled("invalid");
                WalletRecord::failed(key, e.to_string())
            }
            RetryOutcome::Failed {
                error: ResolveError::Network(e),
                attempts,
            } => {
                tracing::warn!(address = %key, attempts, error = %e, "Giving up on address");
                metrics::record_item_settled("failed");
                WalletRecord::failed(key, FETCH_FAILED)
            }
            RetryOutcome::Cancelled { .. } => {
                metrics::record_item_settled("cancelled");
                WalletRecord::failed(key, CANCELLED)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::client::testing::ScriptedQuery;
    use crate::blockchain::client::QueryError;
    use crate::lifecycle::cancel_pair;
    use crate::load_balancer::EndpointPool;
    use crate::scanner::types::RecordStatus;
    use alloy::primitives::{Address, U256};
    use std::time::Duration;
    use tokio::time::Instant;

    const BASE: Duration = Duration::from_millis(1000);

    fn addr(n: u8) -> String {
        format!("0x{}", hex_byte(n).repeat(20))
    }

    fn hex_byte(n: u8) -> String {
        format!("{:02x}", n)
    }

    fn eth(tenths: u64) -> U256 {
        U256::from(tenths) * U256::from(100_000_000_000_000_000u64)
    }

    fn scheduler(query: Arc<ScriptedQuery>, endpoints: usize, batch_size: usize) -> BatchScheduler {
        let urls: Vec<String> = (0..endpoints).map(|i| format!("http://rpc{}.test", i)).collect();
        let pool = Arc::new(EndpointPool::new(urls).unwrap());
        let resolver = Arc::new(BalanceResolver::new(pool, query, Duration::from_secs(10)));
        BatchScheduler::new(resolver, batch_size, RetryPolicy::new(3, BASE))
    }

    #[tokio::test]
    async fn test_single_valid_address() {
        let query = Arc::new(ScriptedQuery::with_fallback(eth(25)));
        let scheduler = scheduler(query, 3, 5);

        let records = scheduler
            .run(vec![ScanItem::Address(addr(0xab))], &CancelSignal::never(), |_| {})
            .await;

        assert_eq!(records.records(), &[WalletRecord::resolved(addr(0xab), "2.5000")]);
    }

    #[tokio::test]
    async fn test_invalid_address_makes_no_call() {
        let query = Arc::new(ScriptedQuery::default());
        let scheduler = scheduler(query.clone(), 3, 5);

        let records = scheduler
            .run(vec![ScanItem::Address("not-an-address".into())], &CancelSignal::never(), |_| {})
            .await;

        assert_eq!(
            records.records(),
            &[WalletRecord::failed("not-an-address", "Invalid address format")]
        );
        assert!(query.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_item_recovers_after_two_backoffs() {
        let query = Arc::new(ScriptedQuery::with_fallback(eth(10)));
        let third: Address = addr(3).parse().unwrap();
        query.fail_times(third, 2, eth(7));
        let scheduler = scheduler(query.clone(), 3, 5);

        let items: Vec<_> = (1..=5).map(|n| ScanItem::Address(addr(n))).collect();
        let started = Instant::now();
        let records = scheduler.run(items, &CancelSignal::never(), |_| {}).await;

        assert_eq!(records.get(&addr(3)).unwrap().balance(), Some("0.7000"));
        assert_eq!(query.calls_for(third), 3);
        // Waits of base*1 then base*2.
        assert_eq!(started.elapsed(), BASE * 3);
        assert!(records.records().iter().all(WalletRecord::checked));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_become_error_record() {
        let query = Arc::new(ScriptedQuery::default());
        let victim: Address = addr(9).parse().unwrap();
        query.script(
            victim,
            (0..10).map(|_| Err(QueryError::Transport("503".into()))).collect(),
        );
        let scheduler = scheduler(query.clone(), 2, 5);

        let started = Instant::now();
        let records = scheduler
            .run(vec![ScanItem::Address(addr(9))], &CancelSignal::never(), |_| {})
            .await;

        assert_eq!(records.records(), &[WalletRecord::failed(addr(9), FETCH_FAILED)]);
        assert_eq!(query.calls_for(victim), 4);
        assert!(started.elapsed() <= scheduler.policy().max_total_delay());
    }

    #[tokio::test]
    async fn test_resubmitting_same_list_yields_same_addresses() {
        let query = Arc::new(ScriptedQuery::with_fallback(eth(3)));
        let scheduler = scheduler(query, 2, 2);
        let items: Vec<_> = (1..=4)
            .map(|n| ScanItem::Address(addr(n)))
            .chain([ScanItem::Address("junk".into()), ScanItem::Address(addr(2))])
            .collect();

        let first = scheduler.run(items.clone(), &CancelSignal::never(), |_| {}).await;
        let second = scheduler.run(items, &CancelSignal::never(), |_| {}).await;

        let keys = |set: &RecordSet| set.records().iter().map(|r| r.address.clone()).collect::<Vec<_>>();
        assert_eq!(keys(&first), keys(&second));
        assert_eq!(first.len(), 5);
        assert!(second.records().iter().all(WalletRecord::checked));

        let mut merged = first.clone();
        merged.merge(second.into_records());
        assert_eq!(merged, first);
    }

    #[tokio::test]
    async fn test_batches_run_in_order_and_report_progress() {
        let query = Arc::new(ScriptedQuery::with_fallback(eth(1)));
        let scheduler = scheduler(query.clone(), 3, 2);
        let items: Vec<_> = (1..=5).map(|n| ScanItem::Address(addr(n))).collect();

        let mut reports = Vec::new();
        scheduler
            .run(items, &CancelSignal::never(), |report| {
                reports.push((
                    report.batch_index,
                    report.batch.len(),
                    report.accumulated.len(),
                    report.progress(),
                ))
            })
            .await;

        assert_eq!(reports, vec![(0, 2, 2, 40), (1, 2, 4, 80), (2, 1, 5, 100)]);

        let order: Vec<Address> = query.calls().into_iter().map(|(_, a)| a).collect();
        let expected: Vec<Address> = (1..=5).map(|n| addr(n).parse().unwrap()).collect();
        // Each batch finishes before the next starts, so calls group by batch.
        let mut first_batch = order[..2].to_vec();
        first_batch.sort();
        assert_eq!(first_batch, expected[..2].to_vec());
        assert_eq!(order[4], expected[4]);
    }

    #[tokio::test]
    async fn test_rejected_secret_settles_without_network() {
        let query = Arc::new(ScriptedQuery::with_fallback(eth(1)));
        let scheduler = scheduler(query.clone(), 1, 5);

        let records = scheduler
            .run(
                vec![ScanItem::RejectedSecret { position: 4 }, ScanItem::Address(addr(1))],
                &CancelSignal::never(),
                |_| {},
            )
            .await;

        assert_eq!(records.records()[0], WalletRecord::failed("secret#4", "Invalid private key format"));
        assert_eq!(query.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_addresses_merge() {
        let query = Arc::new(ScriptedQuery::with_fallback(eth(1)));
        let scheduler = scheduler(query, 1, 5);
        let items = vec![ScanItem::Address(addr(1)), ScanItem::Address(addr(1))];

        let records = scheduler.run(items, &CancelSignal::never(), |_| {}).await;
        assert_eq!(records.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_later_batches() {
        let query = Arc::new(ScriptedQuery::default());
        for n in 1..=2 {
            query.script(
                addr(n).parse().unwrap(),
                (0..4).map(|_| Err(QueryError::Transport("down".into()))).collect(),
            );
        }
        let scheduler = Arc::new(scheduler(query.clone(), 2, 2));
        let (handle, signal) = cancel_pair();
        let items: Vec<_> = (1..=6).map(|n| ScanItem::Address(addr(n))).collect();

        let task = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                let mut reports = 0;
                let records = scheduler.run(items, &signal, |_| reports += 1).await;
                (records, reports)
            })
        };
        tokio::time::sleep(BASE / 2).await;
        handle.cancel();

        let (records, reports) = task.await.unwrap();
        assert_eq!(reports, 1);
        assert_eq!(records.len(), 2);
        assert!(records
            .records()
            .iter()
            .all(|r| r.status == RecordStatus::Failed(CANCELLED.into())));
    }

    #[tokio::test]
    async fn test_empty_run() {
        let scheduler = scheduler(Arc::new(ScriptedQuery::default()), 1, 5);
        let mut reports = 0;
        let records = scheduler.run(Vec::new(), &CancelSignal::never(), |_| reports += 1).await;
        assert!(records.is_empty());
        assert_eq!(reports, 0);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(3, 3), 100);
    }
}
