//! Subscription registry and per-key polling loops.
//!
//! A [`Notifier`] owns one background task per tracked [`ResourceKey`]. The
//! registry mapping keys to running loops is the only state shared between
//! tasks; each loop exclusively owns its "last known snapshot".

pub mod handle;
mod poll;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub use handle::{SubscriptionHandle, SubscriptionState, Termination};

use crate::context::ServiceContext;
use crate::error::SubscribeError;
use crate::model::{current_event_year, ResourceKey, FIRST_EVENT_YEAR};
use crate::store::SnapshotStore;

/// Default time between two fetches of the same scoreboard.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(600);

/// Timing and retry policy shared by all loops of a [`Notifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between ticks. The first tick fires immediately.
    pub interval: Duration,
    /// Consecutive transient fetch failures after which a loop gives up.
    /// `None` retries forever.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval: DEFAULT_INTERVAL, max_consecutive_failures: None }
    }
}

/// Entry point for tracking scoreboards.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Clone)]
pub struct Notifier {
    shared: Arc<Shared>,
}

struct Shared {
    ctx: ServiceContext,
    store: SnapshotStore,
    config: SchedulerConfig,
    registry: Mutex<HashMap<ResourceKey, SubscriptionHandle>>,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, HashMap<ResourceKey, SubscriptionHandle>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes the registry entry of `handle`, unless a newer loop owns the key.
    fn release(&self, handle: &SubscriptionHandle) {
        let mut registry = self.registry();
        if registry.get(&handle.key()).is_some_and(|current| current.id() == handle.id()) {
            registry.remove(&handle.key());
        }
    }
}

impl Notifier {
    /// Creates a notifier with an empty registry.
    #[must_use]
    pub fn new(ctx: ServiceContext, store: SnapshotStore, config: SchedulerConfig) -> Self {
        Self {
            shared: Arc::new(Shared { ctx, store, config, registry: Mutex::new(HashMap::new()) }),
        }
    }

    /// The event year that is current according to the context clock.
    #[must_use]
    pub fn current_event_year(&self) -> i32 {
        current_event_year(self.shared.ctx.clock.now())
    }

    /// Starts tracking the scoreboard of `owner_id` for `year`.
    ///
    /// A year in the future is clamped to the current event year. If a loop
    /// for the key is already running, a handle to it is returned and no
    /// second loop is started. Otherwise the last persisted snapshot seeds a
    /// new loop, so a restart does not repeat notifications.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SubscribeError::InvalidYear`] for years before the first
    /// event and [`SubscribeError::CorruptState`] when the persisted snapshot
    /// cannot be loaded. Nothing is registered in either case.
    pub fn subscribe(
        &self,
        year: i32,
        owner_id: u64,
    ) -> Result<SubscriptionHandle, SubscribeError> {
        if year < FIRST_EVENT_YEAR {
            return Err(SubscribeError::InvalidYear(year));
        }
        let current = self.current_event_year();
        if year > current {
            tracing::debug!(requested = year, current, "clamping future year");
        }
        let key = ResourceKey::new(year.min(current), owner_id);

        // Held across the snapshot load: at most one loop may start per key.
        let mut registry = self.shared.registry();
        let running = registry.get(&key).filter(|handle| {
            !handle.is_cancelled() && handle.state() == SubscriptionState::Active
        });
        if let Some(existing) = running {
            tracing::debug!(leaderboard = %key, subscription = existing.id(), "already subscribed");
            return Ok(existing.clone());
        }

        let seed = self.shared.store.load(key).map_err(|e| {
            tracing::error!(leaderboard = %key, error = %e, "refusing to start from unreadable state");
            SubscribeError::from(e)
        })?;
        let (handle, status) = SubscriptionHandle::new(key, self.shared.ctx.id_gen.generate_id());
        registry.insert(key, handle.clone());
        drop(registry);

        tracing::info!(
            leaderboard = %key,
            subscription = handle.id(),
            resumed = seed.is_some(),
            "subscribed"
        );
        tokio::spawn(poll::run(Arc::clone(&self.shared), handle.clone(), seed, status));
        Ok(handle)
    }

    /// Starts tracking the scoreboard of `owner_id` for the current event year.
    ///
    /// # Errors
    ///
    /// See [`subscribe`](Self::subscribe).
    pub fn subscribe_current(&self, owner_id: u64) -> Result<SubscriptionHandle, SubscribeError> {
        self.subscribe(self.current_event_year(), owner_id)
    }

    /// Keys with a running loop, in key order.
    #[must_use]
    pub fn active_keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self.shared.registry().keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Cancels every loop and waits for all of them to stop.
    pub async fn shutdown(&self) {
        let handles: Vec<SubscriptionHandle> = self.shared.registry().values().cloned().collect();
        tracing::info!(subscriptions = handles.len(), "shutting down");
        for handle in &handles {
            handle.cancel();
        }
        for handle in handles {
            handle.wait().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::{CollectingSink, KeyRenderer};
    use crate::dispatch::Channel;
    use crate::error::{FetchError, ModelError};
    use crate::model::{DayTask, Member, Scoreboard};
    use crate::change::Change;
    use crate::ports::{Clock, FetchFuture, IdGenerator, Renderer, ScoreboardSource};
    use crate::store::tests::MemFs;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const OWNER: u64 = 4711;
    const INTERVAL: Duration = Duration::from_secs(600);

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct SequentialIds(AtomicUsize);

    impl IdGenerator for SequentialIds {
        fn generate_id(&self) -> String {
            format!("sub-{}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    /// Serves a fixed script of results, then reports exhaustion.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Scoreboard, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Scoreboard, FetchError>>) -> Self {
            Self { script: Mutex::new(script.into()), calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ScoreboardSource for ScriptedSource {
        fn fetch(&self, _key: ResourceKey) -> FetchFuture<'_> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            Box::pin(async move { next.unwrap_or(Err(FetchError::Exhausted)) })
        }
    }

    /// Always returns the same scoreboard.
    struct RepeatingSource {
        board: Scoreboard,
        calls: AtomicUsize,
    }

    impl ScoreboardSource for RepeatingSource {
        fn fetch(&self, _key: ResourceKey) -> FetchFuture<'_> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let board = self.board.clone();
            Box::pin(async move { Ok(board) })
        }
    }

    /// Never completes a fetch.
    struct HangingSource;

    impl ScoreboardSource for HangingSource {
        fn fetch(&self, _key: ResourceKey) -> FetchFuture<'_> {
            Box::pin(std::future::pending())
        }
    }

    /// Panics on its first render, then renders like [`KeyRenderer`].
    #[derive(Default)]
    struct CrashOnceRenderer(AtomicBool);

    impl Renderer for CrashOnceRenderer {
        fn render(&self, change: &Change) -> String {
            let crashed_before = self.0.swap(true, Ordering::SeqCst);
            assert!(crashed_before, "renderer crashed");
            KeyRenderer.render(change)
        }
    }

    struct Harness {
        notifier: Notifier,
        fs: Arc<MemFs>,
        sink: Arc<CollectingSink>,
        store: SnapshotStore,
    }

    fn harness(source: Arc<dyn ScoreboardSource>, config: SchedulerConfig) -> Harness {
        harness_with(source, config, Arc::new(KeyRenderer))
    }

    fn harness_with(
        source: Arc<dyn ScoreboardSource>,
        config: SchedulerConfig,
        renderer: Arc<dyn Renderer>,
    ) -> Harness {
        let fs = Arc::new(MemFs::default());
        let sink = Arc::new(CollectingSink::default());
        let ctx = ServiceContext::new(
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2023, 12, 20, 12, 0, 0).unwrap())),
            fs.clone(),
            Arc::new(SequentialIds::default()),
            source,
            vec![Channel::new(renderer, sink.clone())],
        );
        let store = SnapshotStore::new(fs.clone(), Path::new("/state"));
        let notifier = Notifier::new(ctx, store.clone(), config);
        Harness { notifier, fs, sink, store }
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig { interval: INTERVAL, max_consecutive_failures: None }
    }

    fn key() -> ResourceKey {
        ResourceKey::new(2023, OWNER)
    }

    fn board(stars: &[(u64, i64, &[u32])]) -> Scoreboard {
        let mut board = Scoreboard::empty(key());
        for &(id, day, hours) in stars {
            let levels = hours.iter().map(|&h| Utc.with_ymd_and_hms(2023, 12, 1, h, 0, 0).unwrap());
            board.add_member(
                Member::new(id)
                    .with_name(Some(format!("member-{id}")))
                    .with_scores(i64::try_from(hours.len()).unwrap(), 0)
                    .with_task(DayTask::with_levels(day, levels).unwrap()),
            );
        }
        board
    }

    /// Lets spawned tasks run without reaching the next tick.
    async fn settle() {
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    async fn next_tick() {
        tokio::time::sleep(INTERVAL).await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_immediate_then_every_interval() {
        let source =
            Arc::new(RepeatingSource { board: board(&[(1, 1, &[7])]), calls: AtomicUsize::new(0) });
        let h = harness(source.clone(), config());

        h.notifier.subscribe(2023, OWNER).unwrap();
        settle().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        next_tick().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        next_tick().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);

        // Same snapshot every time: one notification for the first sighting only.
        assert_eq!(h.sink.messages().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_skips_the_tick_and_the_next_one_recovers() {
        let first = board(&[(1, 1, &[7])]);
        let second = board(&[(1, 1, &[7, 8])]);
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(first.clone()),
            Err(FetchError::Transport("connection reset".into())),
            Ok(second.clone()),
        ]));
        let h = harness(source.clone(), config());
        let handle = h.notifier.subscribe(2023, OWNER).unwrap();
        let path = h.store.snapshot_path(key());

        settle().await;
        assert_eq!(h.sink.messages().len(), 1);
        let stored_after_first = h.fs.get(&path).unwrap();

        next_tick().await;
        assert_eq!(source.calls(), 2);
        assert_eq!(h.sink.messages().len(), 1, "failed tick must not notify");
        assert_eq!(h.fs.get(&path).unwrap(), stored_after_first, "failed tick must not persist");
        assert_eq!(handle.state(), SubscriptionState::Active);

        next_tick().await;
        assert_eq!(h.sink.messages().len(), 2);
        assert_eq!(h.store.load(key()).unwrap(), Some(second));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_resumes_from_persisted_snapshot() {
        let stored = board(&[(1, 1, &[7])]);
        let newer = board(&[(1, 1, &[7]), (2, 1, &[9])]);
        let source = Arc::new(ScriptedSource::new(vec![Ok(stored.clone()), Ok(newer)]));
        let h = harness(source, config());
        h.store.save(&stored).unwrap();

        h.notifier.subscribe(2023, OWNER).unwrap();
        settle().await;
        assert!(h.sink.messages().is_empty(), "unchanged board after restart is not news");

        next_tick().await;
        assert_eq!(h.sink.messages(), vec!["2023/4711 (2 members)"]);
    }

    #[tokio::test(start_paused = true)]
    async fn second_subscribe_returns_the_running_loop() {
        let source = Arc::new(RepeatingSource { board: board(&[]), calls: AtomicUsize::new(0) });
        let h = harness(source.clone(), config());

        let first = h.notifier.subscribe(2023, OWNER).unwrap();
        let second = h.notifier.subscribe(2023, OWNER).unwrap();
        settle().await;

        assert_eq!(first.id(), second.id());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.notifier.active_keys(), vec![key()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_subscribes_start_exactly_one_loop() {
        let source = Arc::new(RepeatingSource { board: board(&[]), calls: AtomicUsize::new(0) });
        let h = harness(source.clone(), config());

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let notifier = h.notifier.clone();
            tasks.spawn(async move { notifier.subscribe(2023, OWNER).unwrap().id().to_string() });
        }
        let mut ids = Vec::new();
        while let Some(id) = tasks.join_next().await {
            ids.push(id.unwrap());
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        h.notifier.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_releases_the_key_for_a_fresh_loop() {
        let source =
            Arc::new(RepeatingSource { board: board(&[(1, 1, &[7])]), calls: AtomicUsize::new(0) });
        let h = harness(source.clone(), config());

        let handle = h.notifier.subscribe(2023, OWNER).unwrap();
        settle().await;
        handle.cancel();
        assert_eq!(handle.wait().await, Termination::Cancelled);
        assert!(h.notifier.active_keys().is_empty());

        next_tick().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1, "no tick after cancellation");

        let fresh = h.notifier.subscribe(2023, OWNER).unwrap();
        assert_ne!(fresh.id(), handle.id());
        settle().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.sink.messages().len(), 1, "fresh loop is seeded from persistence");
    }

    #[tokio::test(start_paused = true)]
    async fn panicked_loop_releases_the_key() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(board(&[(1, 1, &[7])])),
            Ok(board(&[(1, 1, &[7, 8])])),
        ]));
        let h = harness_with(source.clone(), config(), Arc::new(CrashOnceRenderer::default()));

        let crashed = h.notifier.subscribe(2023, OWNER).unwrap();
        assert_eq!(crashed.wait().await, Termination::Aborted);
        assert!(h.notifier.active_keys().is_empty());

        let fresh = h.notifier.subscribe(2023, OWNER).unwrap();
        assert_ne!(fresh.id(), crashed.id());
        assert_eq!(fresh.state(), SubscriptionState::Active);
        settle().await;
        assert_eq!(source.calls(), 2);
        assert_eq!(h.sink.messages(), vec!["2023/4711 (1 members)".to_string()]);
        h.notifier.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_abandons_a_fetch_in_flight() {
        let h = harness(Arc::new(HangingSource), config());
        let handle = h.notifier.subscribe(2023, OWNER).unwrap();
        settle().await;

        handle.cancel();
        assert_eq!(handle.wait().await, Termination::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn corrupt_state_fails_subscribe_without_registering() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let h = harness(source.clone(), config());
        h.fs.put(&h.store.snapshot_path(key()), "{ definitely not json");

        let err = h.notifier.subscribe(2023, OWNER).unwrap_err();
        assert!(matches!(err, SubscribeError::CorruptState(_)));
        assert!(h.notifier.active_keys().is_empty());
        settle().await;
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn future_year_is_clamped_and_ancient_year_rejected() {
        let h = harness(Arc::new(HangingSource), config());

        let handle = h.notifier.subscribe(2031, OWNER).unwrap();
        assert_eq!(handle.key(), ResourceKey::new(2023, OWNER));
        assert_eq!(h.notifier.subscribe_current(OWNER).unwrap().id(), handle.id());

        assert!(matches!(h.notifier.subscribe(2014, OWNER), Err(SubscribeError::InvalidYear(2014))));
        h.notifier.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_scoreboard_terminates_the_loop() {
        let source = Arc::new(ScriptedSource::new(vec![Err(FetchError::Malformed(
            ModelError::DayOutOfRange(26),
        ))]));
        let h = harness(source, config());

        let handle = h.notifier.subscribe(2023, OWNER).unwrap();
        assert!(matches!(handle.wait().await, Termination::Malformed(msg) if msg.contains("26")));
        assert!(h.notifier.active_keys().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_failures_exhaust_the_retry_budget() {
        let failures = (0..5).map(|_| Err(FetchError::Status { status: 502, body: String::new() }));
        let source = Arc::new(ScriptedSource::new(failures.collect()));
        let h = harness(
            source.clone(),
            SchedulerConfig { interval: INTERVAL, max_consecutive_failures: Some(3) },
        );

        let handle = h.notifier.subscribe(2023, OWNER).unwrap();
        assert_eq!(handle.wait().await, Termination::FetchFailuresExhausted { attempts: 3 });
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn persistence_failure_still_notifies_and_advances() {
        let first = board(&[(1, 1, &[7])]);
        let source = Arc::new(ScriptedSource::new(vec![Ok(first.clone()), Ok(first)]));
        let h = harness(source, config());
        h.fs.fail_writes.store(true, Ordering::SeqCst);

        h.notifier.subscribe(2023, OWNER).unwrap();
        settle().await;
        assert_eq!(h.sink.messages().len(), 1);

        next_tick().await;
        assert_eq!(h.sink.messages().len(), 1, "in-memory snapshot advanced despite the failed save");
        assert_eq!(h.fs.file_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_every_loop() {
        let h = harness(Arc::new(HangingSource), config());
        let a = h.notifier.subscribe(2022, OWNER).unwrap();
        let b = h.notifier.subscribe(2023, OWNER + 1).unwrap();
        settle().await;
        assert_eq!(h.notifier.active_keys().len(), 2);

        h.notifier.shutdown().await;
        assert_eq!(a.state(), SubscriptionState::Terminated(Termination::Cancelled));
        assert_eq!(b.state(), SubscriptionState::Terminated(Termination::Cancelled));
        assert!(h.notifier.active_keys().is_empty());
    }
}
