//! RequestScheduler -- bounded-concurrency FIFO queue for turn requests.
//!
//! One scheduler is shared process-wide. Its three collections (pending,
//! processing, completed) sit behind a single mutex that is held only for
//! the duration of a mutation; pipelines run as independent tasks outside
//! the lock, and each finished pipeline triggers another admission pass.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use turnstile_types::config::ServiceConfig;
use turnstile_types::error::QueueError;
use turnstile_types::queue::{
    ItemOutcome, ItemSnapshot, QueueStats, QueueStatus, SubmitReceipt, TurnRequest,
};

use crate::history::disposition;
use crate::turn::processor::TurnProcessor;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Concurrency and retention settings for a [`RequestScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Items allowed in `processing` at once.
    pub max_concurrent: usize,
    /// How long a finished item stays queryable.
    pub retention: Duration,
}

impl SchedulerOptions {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent.max(1),
            retention: config.retention(),
        }
    }
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            retention: Duration::from_secs(60),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Finished {
    outcome: ItemOutcome,
    finished_at: Instant,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<(Uuid, TurnRequest)>,
    /// Admitted items and when they were admitted.
    processing: HashMap<Uuid, Instant>,
    completed: HashMap<Uuid, Finished>,
}

impl QueueState {
    fn pending_position(&self, id: Uuid) -> Option<usize> {
        self.pending
            .iter()
            .position(|(pending_id, _)| *pending_id == id)
            .map(|idx| idx + 1)
    }

    /// Finished entry for `id`, unless it has outlived `retention`.
    fn finished(&self, id: Uuid, retention: Duration) -> Option<&Finished> {
        self.completed
            .get(&id)
            .filter(|f| f.finished_at.elapsed() <= retention)
    }
}

// ---------------------------------------------------------------------------
// RequestScheduler
// ---------------------------------------------------------------------------

/// Accepts turn requests, admits up to `max_concurrent` at a time in FIFO
/// order, and keeps finished results for the retention window.
///
/// Generic over `P: TurnProcessor` so tests can drive it without a network.
/// Methods that spawn work take `self: &Arc<Self>`.
pub struct RequestScheduler<P: TurnProcessor> {
    processor: Arc<P>,
    options: SchedulerOptions,
    state: Mutex<QueueState>,
}

impl<P: TurnProcessor> RequestScheduler<P> {
    pub fn new(processor: P, options: SchedulerOptions) -> Self {
        Self {
            processor: Arc::new(processor),
            options,
            state: Mutex::new(QueueState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate and enqueue a request, then trigger an admission pass.
    ///
    /// The returned position is the 1-based length of the pending list
    /// right after the push. Rejected submissions are never enqueued.
    pub fn submit(self: &Arc<Self>, request: TurnRequest) -> Result<SubmitReceipt, QueueError> {
        disposition::validate(
            &request.state.messages,
            &request.disposition,
            &request.user_input,
            request.kind,
        )
        .map_err(QueueError::Validation)?;

        let id = Uuid::now_v7();
        let position = {
            let mut state = self.lock();
            state.pending.push_back((id, request));
            state.pending.len()
        };
        tracing::info!(request_id = %id, position, "request queued");

        let this = Arc::clone(self);
        tokio::spawn(async move { this.admit() });

        Ok(SubmitReceipt { id, position })
    }

    /// Move pending items into `processing` while slots are free, then start
    /// their pipelines outside the lock.
    fn admit(self: &Arc<Self>) {
        let admitted = {
            let mut state = self.lock();
            let mut batch = Vec::new();
            while state.processing.len() < self.options.max_concurrent {
                let Some((id, request)) = state.pending.pop_front() else {
                    break;
                };
                state.processing.insert(id, Instant::now());
                batch.push((id, request));
            }
            batch
        };

        for (id, request) in admitted {
            tracing::debug!(request_id = %id, "request admitted");
            let this = Arc::clone(self);
            let span = tracing::info_span!("queue_item", request_id = %id);
            tokio::spawn(async move { this.run_item(id, request).await }.instrument(span));
        }
    }

    /// Run one pipeline to completion, record its outcome, free the slot.
    async fn run_item(self: Arc<Self>, id: Uuid, request: TurnRequest) {
        let processor = Arc::clone(&self.processor);
        // A panicking pipeline must still release its slot.
        let joined = tokio::spawn(
            async move { processor.process(request).await }.in_current_span(),
        )
        .await;

        let outcome = match joined {
            Ok(Ok(result)) => ItemOutcome::Completed(result),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "request failed");
                ItemOutcome::Failed(e.to_string())
            }
            Err(e) => {
                tracing::error!(error = %e, "pipeline task aborted");
                ItemOutcome::Failed("pipeline task aborted".to_string())
            }
        };

        {
            let mut state = self.lock();
            if let Some(started) = state.processing.remove(&id) {
                tracing::info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    success = matches!(outcome, ItemOutcome::Completed(_)),
                    "request finished"
                );
            }
            state.completed.insert(
                id,
                Finished {
                    outcome,
                    finished_at: Instant::now(),
                },
            );
        }

        self.admit();
    }

    /// Point-in-time view of one request.
    pub fn snapshot(&self, id: Uuid) -> Result<ItemSnapshot, QueueError> {
        let state = self.lock();
        let queue_length = state.pending.len();

        if let Some(position) = state.pending_position(id) {
            return Ok(ItemSnapshot {
                id,
                status: QueueStatus::Queued,
                position,
                queue_length,
                outcome: None,
            });
        }
        if state.processing.contains_key(&id) {
            return Ok(ItemSnapshot {
                id,
                status: QueueStatus::Processing,
                position: 0,
                queue_length,
                outcome: None,
            });
        }
        let finished = state
            .finished(id, self.options.retention)
            .ok_or(QueueError::NotFound)?;
        let status = match finished.outcome {
            ItemOutcome::Completed(_) => QueueStatus::Completed,
            ItemOutcome::Failed(_) => QueueStatus::Error,
        };
        Ok(ItemSnapshot {
            id,
            status,
            position: 0,
            queue_length,
            outcome: Some(finished.outcome.clone()),
        })
    }

    pub fn get_status(&self, id: Uuid) -> Result<QueueStatus, QueueError> {
        let state = self.lock();
        if state.pending_position(id).is_some() {
            Ok(QueueStatus::Queued)
        } else if state.processing.contains_key(&id) {
            Ok(QueueStatus::Processing)
        } else {
            match state.finished(id, self.options.retention) {
                Some(Finished {
                    outcome: ItemOutcome::Completed(_),
                    ..
                }) => Ok(QueueStatus::Completed),
                Some(_) => Ok(QueueStatus::Error),
                None => Err(QueueError::NotFound),
            }
        }
    }

    /// 1-based pending position; 0 once the item has been admitted.
    pub fn get_position(&self, id: Uuid) -> Result<usize, QueueError> {
        let state = self.lock();
        if let Some(position) = state.pending_position(id) {
            return Ok(position);
        }
        if state.processing.contains_key(&id)
            || state.finished(id, self.options.retention).is_some()
        {
            return Ok(0);
        }
        Err(QueueError::NotFound)
    }

    /// Terminal outcome, or `None` while the item is still queued or running.
    pub fn get_result(&self, id: Uuid) -> Result<Option<ItemOutcome>, QueueError> {
        self.snapshot(id).map(|s| s.outcome)
    }

    /// Remove a request that has not been admitted yet.
    pub fn cancel(&self, id: Uuid) -> Result<(), QueueError> {
        let mut state = self.lock();
        let idx = state
            .pending
            .iter()
            .position(|(pending_id, _)| *pending_id == id)
            .ok_or(QueueError::NotFound)?;
        state.pending.remove(idx);
        tracing::info!(request_id = %id, "queued request cancelled");
        Ok(())
    }

    /// Evict finished items older than the retention window.
    ///
    /// Returns the number of evicted items.
    pub fn cleanup(&self) -> usize {
        let retention = self.options.retention;
        let mut state = self.lock();
        let before = state.completed.len();
        state
            .completed
            .retain(|_, f| f.finished_at.elapsed() <= retention);
        let evicted = before - state.completed.len();
        if evicted > 0 {
            tracing::debug!(evicted, retained = state.completed.len(), "evicted expired results");
        }
        evicted
    }

    /// Counts across the three collections. `retained` includes finished
    /// items awaiting eviction.
    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        QueueStats {
            queued: state.pending.len(),
            processing: state.processing.len(),
            retained: state.completed.len(),
            max_concurrent: self.options.max_concurrent,
        }
    }

    /// Run [`Self::cleanup`] every `interval` until `shutdown` is cancelled.
    pub fn spawn_cleanup(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        this.cleanup();
                    }
                }
            }
            tracing::debug!("cleanup loop stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;
    use turnstile_types::error::PipelineError;
    use turnstile_types::message::{ConversationState, Message};
    use turnstile_types::queue::{Disposition, RequestKind, TurnResult};
    use turnstile_types::settings::Settings;

    /// Processor that blocks each request until its gate (keyed by user
    /// input) is opened. Inputs starting with `now` finish immediately,
    /// `fail` fails, and `panic` panics.
    #[derive(Default)]
    struct GatedProcessor {
        gates: Mutex<HashMap<String, Arc<Semaphore>>>,
        started: AtomicUsize,
    }

    impl GatedProcessor {
        fn gate(&self, key: &str) -> Arc<Semaphore> {
            self.gates
                .lock()
                .unwrap()
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(0)))
                .clone()
        }
    }

    impl TurnProcessor for Arc<GatedProcessor> {
        async fn process(&self, request: TurnRequest) -> Result<TurnResult, PipelineError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let input = request.user_input.clone();
            if !input.starts_with("now") {
                let gate = self.gate(&input);
                gate.acquire().await.unwrap().forget();
            }
            if input.starts_with("panic") {
                panic!("processor blew up");
            }
            if input.starts_with("fail") {
                return Err(PipelineError::Invariant("broken".to_string()));
            }
            Ok(TurnResult {
                messages: request.state.messages,
                system_prompt: input,
                title: None,
            })
        }
    }

    fn scheduler(retention: Duration) -> (Arc<RequestScheduler<Arc<GatedProcessor>>>, Arc<GatedProcessor>) {
        let processor = Arc::new(GatedProcessor::default());
        let scheduler = Arc::new(RequestScheduler::new(
            processor.clone(),
            SchedulerOptions {
                max_concurrent: 3,
                retention,
            },
        ));
        (scheduler, processor)
    }

    fn turn(input: &str) -> TurnRequest {
        TurnRequest {
            state: ConversationState::default(),
            user_input: input.to_string(),
            user_name: "Sam".to_string(),
            disposition: Disposition::NewTurn,
            settings: Settings::default(),
            kind: RequestKind::Turn,
            use_fallback_prompt: false,
        }
    }

    /// Let every runnable task make progress.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    fn rank(status: QueueStatus) -> u8 {
        match status {
            QueueStatus::Queued => 0,
            QueueStatus::Processing => 1,
            QueueStatus::Completed | QueueStatus::Error => 2,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_positions_are_one_based_in_submission_order() {
        let (scheduler, _) = scheduler(Duration::from_secs(60));
        let positions: Vec<usize> = (0..5)
            .map(|i| scheduler.submit(turn(&format!("t{i}"))).unwrap().position)
            .collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_limit_then_admission_after_completion() {
        let (scheduler, processor) = scheduler(Duration::from_secs(60));
        let ids: Vec<Uuid> = (0..5)
            .map(|i| scheduler.submit(turn(&format!("t{i}"))).unwrap().id)
            .collect();
        settle().await;

        let stats = scheduler.stats();
        assert_eq!(stats.processing, 3);
        assert_eq!(stats.queued, 2);
        for id in &ids[..3] {
            assert_eq!(scheduler.get_status(*id).unwrap(), QueueStatus::Processing);
            assert_eq!(scheduler.get_position(*id).unwrap(), 0);
        }
        assert_eq!(scheduler.get_position(ids[3]).unwrap(), 1);
        assert_eq!(scheduler.get_position(ids[4]).unwrap(), 2);
        assert_eq!(processor.started.load(Ordering::SeqCst), 3);

        processor.gate("t0").add_permits(1);
        settle().await;

        assert_eq!(scheduler.get_status(ids[0]).unwrap(), QueueStatus::Completed);
        assert_eq!(scheduler.get_status(ids[3]).unwrap(), QueueStatus::Processing);
        assert_eq!(scheduler.get_status(ids[4]).unwrap(), QueueStatus::Queued);
        assert_eq!(scheduler.get_position(ids[4]).unwrap(), 1);
        assert_eq!(scheduler.stats().processing, 3);

        match scheduler.get_result(ids[0]).unwrap() {
            Some(ItemOutcome::Completed(result)) => assert_eq!(result.system_prompt, "t0"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(scheduler.get_result(ids[4]).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_regeneration_is_never_enqueued() {
        let (scheduler, processor) = scheduler(Duration::from_secs(60));
        let mut request = turn("");
        request.state.messages = vec![Message::user("hi"), Message::assistant("hello")];
        request.disposition = Disposition::Regenerate;

        let err = scheduler.submit(request).unwrap_err();
        assert!(matches!(err, QueueError::Validation(_)));
        settle().await;

        let stats = scheduler.stats();
        assert_eq!((stats.queued, stats.processing, stats.retained), (0, 0, 0));
        assert_eq!(processor.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_frees_slot_for_next_item() {
        let (scheduler, processor) = scheduler(Duration::from_secs(60));
        let failing = scheduler.submit(turn("fail0")).unwrap().id;
        let _ = scheduler.submit(turn("t1")).unwrap();
        let _ = scheduler.submit(turn("t2")).unwrap();
        let waiting = scheduler.submit(turn("t3")).unwrap().id;
        settle().await;
        assert_eq!(scheduler.get_status(waiting).unwrap(), QueueStatus::Queued);

        processor.gate("fail0").add_permits(1);
        settle().await;

        let snapshot = scheduler.snapshot(failing).unwrap();
        assert_eq!(snapshot.status, QueueStatus::Error);
        assert!(matches!(snapshot.outcome, Some(ItemOutcome::Failed(ref msg)) if msg.contains("broken")));
        assert_eq!(scheduler.get_status(waiting).unwrap(), QueueStatus::Processing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_pipeline_still_releases_slot() {
        let (scheduler, processor) = scheduler(Duration::from_secs(60));
        let doomed = scheduler.submit(turn("panic")).unwrap().id;
        let _ = scheduler.submit(turn("t1")).unwrap();
        let _ = scheduler.submit(turn("t2")).unwrap();
        let waiting = scheduler.submit(turn("now")).unwrap().id;
        settle().await;

        processor.gate("panic").add_permits(1);
        settle().await;

        assert_eq!(scheduler.get_status(doomed).unwrap(), QueueStatus::Error);
        assert_eq!(scheduler.get_status(waiting).unwrap(), QueueStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_is_monotonic() {
        let (scheduler, processor) = scheduler(Duration::from_secs(60));
        let ids: Vec<Uuid> = (0..4)
            .map(|i| scheduler.submit(turn(&format!("m{i}"))).unwrap().id)
            .collect();
        let watched = ids[3];

        let mut seen = vec![scheduler.get_status(watched).unwrap()];
        for i in 0..4 {
            settle().await;
            seen.push(scheduler.get_status(watched).unwrap());
            processor.gate(&format!("m{i}")).add_permits(1);
        }
        settle().await;
        seen.push(scheduler.get_status(watched).unwrap());

        assert!(seen.windows(2).all(|w| rank(w[0]) <= rank(w[1])), "{seen:?}");
        assert_eq!(seen.first(), Some(&QueueStatus::Queued));
        assert_eq!(seen.last(), Some(&QueueStatus::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_unreachable_strictly_after_retention() {
        let (scheduler, _) = scheduler(Duration::from_secs(60));
        let id = scheduler.submit(turn("now")).unwrap().id;
        settle().await;
        assert_eq!(scheduler.get_status(id).unwrap(), QueueStatus::Completed);

        // 1ms already elapsed in settle()
        tokio::time::advance(Duration::from_millis(59_999)).await;
        assert_eq!(scheduler.get_status(id).unwrap(), QueueStatus::Completed);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(scheduler.get_status(id), Err(QueueError::NotFound));
        assert_eq!(scheduler.get_result(id), Err(QueueError::NotFound));
        assert_eq!(scheduler.get_position(id), Err(QueueError::NotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_evicts_only_expired() {
        let (scheduler, _) = scheduler(Duration::from_secs(60));
        let old = scheduler.submit(turn("now-old")).unwrap().id;
        settle().await;
        tokio::time::advance(Duration::from_secs(30)).await;
        let fresh = scheduler.submit(turn("now-fresh")).unwrap().id;
        settle().await;
        tokio::time::advance(Duration::from_secs(31)).await;

        assert_eq!(scheduler.cleanup(), 1);
        assert_eq!(scheduler.stats().retained, 1);
        assert_eq!(scheduler.get_status(old), Err(QueueError::NotFound));
        assert_eq!(scheduler.get_status(fresh).unwrap(), QueueStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_loop_runs_until_cancelled() {
        let (scheduler, _) = scheduler(Duration::from_secs(60));
        let shutdown = CancellationToken::new();
        let handle = scheduler.spawn_cleanup(Duration::from_secs(60), shutdown.clone());

        scheduler.submit(turn("now")).unwrap();
        settle().await;
        assert_eq!(scheduler.stats().retained, 1);

        // Tick at 60s: exactly at the window, kept. Tick at 120s: evicted.
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(scheduler.stats().retained, 1);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(scheduler.stats().retained, 0);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_only_pending_items() {
        let (scheduler, _) = scheduler(Duration::from_secs(60));
        let ids: Vec<Uuid> = (0..5)
            .map(|i| scheduler.submit(turn(&format!("c{i}"))).unwrap().id)
            .collect();
        settle().await;

        assert_eq!(scheduler.cancel(ids[0]), Err(QueueError::NotFound));
        assert_eq!(scheduler.cancel(ids[3]), Ok(()));
        assert_eq!(scheduler.get_status(ids[3]), Err(QueueError::NotFound));
        assert_eq!(scheduler.get_position(ids[4]).unwrap(), 1);
        assert_eq!(scheduler.cancel(ids[3]), Err(QueueError::NotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_id_is_not_found() {
        let (scheduler, _) = scheduler(Duration::from_secs(60));
        let id = Uuid::now_v7();
        assert_eq!(scheduler.get_status(id), Err(QueueError::NotFound));
        assert!(matches!(scheduler.snapshot(id), Err(QueueError::NotFound)));
    }
}
