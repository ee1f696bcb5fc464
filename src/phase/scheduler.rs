//! Phase scheduler.
//!
//! The `PhaseScheduler` plays one [`PhaseTable`] on Tokio timers. Each run
//! (generation) arms two tasks:
//!
//! - a timeline task that enters every phase after the first at its start
//!   offset, then marks the run complete once the terminal phase has run
//!   its full duration
//! - a message ticker that bumps the status message index on a fixed
//!   interval, independent of phase boundaries
//!
//! Both tasks capture the generation they were armed under. `restart` and
//! teardown bump the generation and cancel the run's token, so a timer
//! that fires late finds a stale generation and is dropped without touching
//! state or invoking callbacks.
//!
//! Callbacks are delivered under a shared read guard. `restart` and
//! teardown take it for writing, so on a multi-threaded runtime they wait
//! for a callback that already passed its generation check. Called from
//! inside a callback they skip the guard.

use std::cell::Cell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SchedulerError;
use crate::observability::metrics::{self, CompletionMode};

use super::state::{RunState, SchedulerSnapshot};
use super::table::{Phase, PhaseTable};

/// Status message tick interval used when none is configured.
pub const DEFAULT_MESSAGE_INTERVAL: Duration = Duration::from_millis(500);

/// Invoked with the new phase on every transition after the first phase.
pub type PhaseChangeCallback = Arc<dyn Fn(Phase) + Send + Sync>;

/// Invoked once per run when the sequence completes.
pub type CompleteCallback = Arc<dyn Fn() + Send + Sync>;

/// Construction options for [`PhaseScheduler`].
#[derive(Clone)]
pub struct SchedulerOptions {
    /// Phase-change observer.
    pub on_phase_change: Option<PhaseChangeCallback>,
    /// Completion observer.
    pub on_complete: Option<CompleteCallback>,
    /// Skip straight to the completed terminal state.
    pub reduced_motion: bool,
    /// Period of the status message tick.
    pub message_interval: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            on_phase_change: None,
            on_complete: None,
            reduced_motion: false,
            message_interval: DEFAULT_MESSAGE_INTERVAL,
        }
    }
}

impl SchedulerOptions {
    /// Sets the phase-change observer.
    #[must_use]
    pub fn on_phase_change(mut self, f: impl Fn(Phase) + Send + Sync + 'static) -> Self {
        self.on_phase_change = Some(Arc::new(f));
        self
    }

    /// Sets the completion observer.
    #[must_use]
    pub fn on_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }

    /// Enables or disables the reduced-motion bypass.
    #[must_use]
    pub const fn reduced_motion(mut self, enabled: bool) -> Self {
        self.reduced_motion = enabled;
        self
    }

    /// Sets the status message tick interval.
    #[must_use]
    pub const fn message_interval(mut self, interval: Duration) -> Self {
        self.message_interval = interval;
        self
    }
}

impl std::fmt::Debug for SchedulerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerOptions")
            .field("on_phase_change", &self.on_phase_change.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("reduced_motion", &self.reduced_motion)
            .field("message_interval", &self.message_interval)
            .finish()
    }
}

/// What a timeline timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Enter(Phase),
    Complete,
}

impl TimerKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Enter(_) => "phase",
            Self::Complete => "complete",
        }
    }
}

/// Timeline for one run, as offsets from run start.
///
/// The completion timer sits strictly after the terminal phase's own entry
/// because every duration is positive.
fn timeline(table: &PhaseTable) -> Vec<(Duration, TimerKind)> {
    let mut timers: Vec<_> = table.entries()[1..]
        .iter()
        .map(|entry| (entry.start, TimerKind::Enter(entry.phase)))
        .collect();
    timers.push((table.total_duration(), TimerKind::Complete));
    timers
}

thread_local! {
    /// Scheduler whose callback is running on this thread, by address.
    static DELIVERING: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as delivering a callback until dropped.
struct DeliveryScope {
    previous: usize,
}

impl DeliveryScope {
    fn enter(shared: &Shared) -> Self {
        let previous = DELIVERING.with(|d| d.replace(shared.id()));
        Self { previous }
    }
}

impl Drop for DeliveryScope {
    fn drop(&mut self) {
        DELIVERING.with(|d| d.set(self.previous));
    }
}

/// State shared between the scheduler handle and its timer tasks.
struct Shared {
    table: PhaseTable,
    options: SchedulerOptions,
    state: Mutex<RunState>,
    delivery: RwLock<()>,
    updates: watch::Sender<SchedulerSnapshot>,
}

/// Callback to deliver after the state lock is released.
enum Delivery {
    None,
    PhaseChanged(Phase),
    Completed,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn id(&self) -> usize {
        std::ptr::from_ref(self).addr()
    }

    /// Waits for in-flight callbacks. Returns `None` when called from one.
    fn quiesce(&self) -> Option<RwLockWriteGuard<'_, ()>> {
        if DELIVERING.with(Cell::get) == self.id() {
            return None;
        }
        Some(self.delivery.write().unwrap_or_else(PoisonError::into_inner))
    }

    fn publish(&self, state: &RunState) {
        self.updates.send_replace(state.snapshot);
    }

    /// Applies a timeline timer. Returns `false` if the timer was stale.
    fn fire(&self, generation: u64, kind: TimerKind) -> bool {
        let _guard = self.delivery.read().unwrap_or_else(PoisonError::into_inner);
        let delivery = {
            let mut state = self.lock_state();
            if !state.is_current(generation) {
                debug!(generation, timer = kind.label(), "discarding stale timer");
                metrics::record_stale_timer(kind.label());
                return false;
            }
            match kind {
                TimerKind::Enter(phase) => {
                    if !state.enter(phase) {
                        return false;
                    }
                    self.publish(&state);
                    info!(generation, phase = %phase, "phase entered");
                    metrics::record_phase_transition(phase);
                    Delivery::PhaseChanged(phase)
                }
                TimerKind::Complete => {
                    let first = state.complete();
                    self.publish(&state);
                    if first {
                        info!(generation, "sequence complete");
                        metrics::record_completion(CompletionMode::Animated);
                        Delivery::Completed
                    } else {
                        Delivery::None
                    }
                }
            }
        };

        let _scope = DeliveryScope::enter(self);
        match delivery {
            Delivery::PhaseChanged(phase) => {
                if let Some(cb) = &self.options.on_phase_change {
                    cb(phase);
                }
            }
            Delivery::Completed => {
                if let Some(cb) = &self.options.on_complete {
                    cb();
                }
            }
            Delivery::None => {}
        }
        true
    }

    /// Applies a message tick. Returns `false` if the tick was stale.
    fn tick_message(&self, generation: u64) -> bool {
        let mut state = self.lock_state();
        if !state.is_current(generation) {
            debug!(generation, timer = "message", "discarding stale timer");
            metrics::record_stale_timer("message");
            return false;
        }
        let index = state.advance_message();
        self.publish(&state);
        debug!(generation, message_index = index, "status message advanced");
        true
    }
}

/// Tasks and token belonging to one generation.
struct RunHandle {
    cancel: CancellationToken,
    tasks: [JoinHandle<()>; 2],
}

impl RunHandle {
    fn cancel(self) {
        self.cancel.cancel();
        for task in self.tasks {
            task.abort();
        }
    }
}

/// Plays a phase table on timers and publishes its progress.
///
/// Mounting starts the first run immediately. Dropping the scheduler (or
/// calling [`shutdown`](Self::shutdown)) cancels every pending timer; no
/// callback fires afterwards.
///
/// Callbacks run on a Tokio worker after the state lock is released, so
/// they may call back into the scheduler, including `restart`, `shutdown`
/// and dropping it.
pub struct PhaseScheduler {
    shared: Arc<Shared>,
    runtime: Option<Handle>,
    cancel: CancellationToken,
    run: Mutex<Option<RunHandle>>,
}

impl PhaseScheduler {
    /// Mounts a scheduler for `table`.
    ///
    /// With `reduced_motion` set the scheduler starts in the completed
    /// terminal state and `on_complete` is invoked before this returns; no
    /// timers are armed and no runtime is required.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::RuntimeUnavailable`] if timers are needed and
    /// the caller is not inside a Tokio runtime.
    pub fn new(table: PhaseTable, options: SchedulerOptions) -> Result<Self, SchedulerError> {
        let runtime = Handle::try_current().ok();

        if options.reduced_motion {
            let scheduler = Self::assemble(
                table,
                options,
                RunState::new(SchedulerSnapshot::finished(), true),
                runtime,
            );
            info!("reduced motion: skipping to {}", Phase::TERMINAL);
            metrics::record_completion(CompletionMode::ReducedMotion);
            if let Some(cb) = &scheduler.shared.options.on_complete {
                cb();
            }
            return Ok(scheduler);
        }

        let Some(runtime) = runtime else {
            return Err(SchedulerError::RuntimeUnavailable);
        };
        let scheduler = Self::assemble(
            table,
            options,
            RunState::new(SchedulerSnapshot::initial(), false),
            Some(runtime),
        );
        scheduler.start_run();
        Ok(scheduler)
    }

    fn assemble(
        table: PhaseTable,
        options: SchedulerOptions,
        state: RunState,
        runtime: Option<Handle>,
    ) -> Self {
        let (updates, _) = watch::channel(state.snapshot);
        Self {
            shared: Arc::new(Shared {
                table,
                options,
                state: Mutex::new(state),
                delivery: RwLock::new(()),
                updates,
            }),
            runtime,
            cancel: CancellationToken::new(),
            run: Mutex::new(None),
        }
    }

    fn lock_run(&self) -> MutexGuard<'_, Option<RunHandle>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancels the previous generation and arms a fresh one.
    fn start_run(&self) {
        let Some(runtime) = &self.runtime else {
            warn!("restart ignored: no Tokio runtime was available at mount");
            return;
        };

        let _quiet = self.shared.quiesce();
        let mut run = self.lock_run();
        if let Some(previous) = run.take() {
            previous.cancel();
        }

        let generation = {
            let mut state = self.shared.lock_state();
            if state.torn_down {
                warn!("restart ignored: scheduler has been shut down");
                return;
            }
            let generation = state.begin_run();
            self.shared.publish(&state);
            generation
        };

        let started_at = Instant::now();
        let token = self.cancel.child_token();
        // interval() panics on a zero period.
        let interval = self.shared.options.message_interval.max(Duration::from_millis(1));

        info!(
            generation,
            total_ms = u64::try_from(self.shared.table.total_duration().as_millis())
                .unwrap_or(u64::MAX),
            "sequence started"
        );

        let timeline_task = runtime.spawn(run_timeline(
            Arc::clone(&self.shared),
            generation,
            started_at,
            token.clone(),
        ));
        let ticker_task = runtime.spawn(run_message_ticker(
            Arc::clone(&self.shared),
            generation,
            started_at,
            interval,
            token.clone(),
        ));

        *run = Some(RunHandle {
            cancel: token,
            tasks: [timeline_task, ticker_task],
        });
    }

    /// Restarts the sequence from the first phase.
    ///
    /// Every timer from the previous run is invalidated, so nothing from it
    /// can leak into the new run. Ignored after [`shutdown`](Self::shutdown).
    pub fn restart(&self) {
        info!(generation = self.generation(), "restarting sequence");
        metrics::record_restart();
        self.start_run();
    }

    /// Cancels all timers. Idempotent; also performed on drop.
    ///
    /// If a callback is running on another thread this waits for it to
    /// return. No callback starts after `shutdown` returns.
    pub fn shutdown(&self) {
        let _quiet = self.shared.quiesce();
        let mut run = self.lock_run();
        {
            let mut state = self.shared.lock_state();
            if !state.tear_down() {
                return;
            }
        }
        self.cancel.cancel();
        if let Some(run) = run.take() {
            run.cancel();
        }
        debug!("phase scheduler torn down");
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.snapshot().phase
    }

    /// Whether the current run has completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.snapshot().is_complete
    }

    /// Current status message index.
    #[must_use]
    pub fn message_index(&self) -> usize {
        self.snapshot().message_index
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.shared.lock_state().snapshot
    }

    /// Subscribes to state changes.
    ///
    /// The receiver sees every phase entry, completion, message tick and
    /// restart. It stops receiving updates after teardown.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SchedulerSnapshot> {
        self.shared.updates.subscribe()
    }

    /// The table being played.
    #[must_use]
    pub fn table(&self) -> &PhaseTable {
        &self.shared.table
    }

    /// Number of runs started so far, plus one if torn down.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.lock_state().generation
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shared.lock_state().torn_down
    }
}

impl Drop for PhaseScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for PhaseScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock_state();
        f.debug_struct("PhaseScheduler")
            .field("phase", &state.snapshot.phase)
            .field("is_complete", &state.snapshot.is_complete)
            .field("message_index", &state.snapshot.message_index)
            .field("generation", &state.generation)
            .finish_non_exhaustive()
    }
}

async fn run_timeline(
    shared: Arc<Shared>,
    generation: u64,
    started_at: Instant,
    cancel: CancellationToken,
) {
    for (offset, kind) in timeline(&shared.table) {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tokio::time::sleep_until(started_at + offset) => {}
        }
        if !shared.fire(generation, kind) {
            return;
        }
    }
}

async fn run_message_ticker(
    shared: Arc<Shared>,
    generation: u64,
    started_at: Instant,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(started_at + period, period);
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        if !shared.tick_message(generation) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Weak;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Lets spawned timer tasks observe the current (paused) clock.
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance(n: u64) {
        tokio::time::advance(ms(n)).await;
        settle().await;
    }

    #[derive(Clone, Default)]
    struct Recorder {
        phases: Arc<Mutex<Vec<Phase>>>,
        completions: Arc<AtomicUsize>,
    }

    impl Recorder {
        fn options(&self) -> SchedulerOptions {
            let phases = Arc::clone(&self.phases);
            let completions = Arc::clone(&self.completions);
            SchedulerOptions::default()
                .on_phase_change(move |p| phases.lock().unwrap().push(p))
                .on_complete(move || {
                    completions.fetch_add(1, Ordering::SeqCst);
                })
        }

        fn phases(&self) -> Vec<Phase> {
            self.phases.lock().unwrap().clone()
        }

        fn completions(&self) -> usize {
            self.completions.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_timeline_from_standard_table() {
        let timers = timeline(&PhaseTable::standard());
        assert_eq!(
            timers,
            vec![
                (ms(1000), TimerKind::Enter(Phase::PathReveal)),
                (ms(2000), TimerKind::Enter(Phase::ContainerShake)),
                (ms(3500), TimerKind::Enter(Phase::StickEject)),
                (ms(4500), TimerKind::Enter(Phase::Reveal)),
                (ms(5000), TimerKind::Complete),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_state() {
        let scheduler =
            PhaseScheduler::new(PhaseTable::standard(), SchedulerOptions::default()).unwrap();
        assert_eq!(scheduler.phase(), Phase::GatePass);
        assert!(!scheduler.is_complete());
        assert_eq!(scheduler.message_index(), 0);
        assert_eq!(scheduler.generation(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_sequence_at_table_offsets() {
        let recorder = Recorder::default();
        let scheduler = PhaseScheduler::new(PhaseTable::standard(), recorder.options()).unwrap();
        settle().await;
        assert_eq!(scheduler.phase(), Phase::GatePass);

        advance(1000).await;
        assert_eq!(scheduler.phase(), Phase::PathReveal);
        advance(1000).await;
        assert_eq!(scheduler.phase(), Phase::ContainerShake);
        advance(1500).await;
        assert_eq!(scheduler.phase(), Phase::StickEject);
        advance(1000).await;
        assert_eq!(scheduler.phase(), Phase::Reveal);

        assert_eq!(
            recorder.phases(),
            vec![
                Phase::PathReveal,
                Phase::ContainerShake,
                Phase::StickEject,
                Phase::Reveal
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_transition_before_boundary() {
        let scheduler =
            PhaseScheduler::new(PhaseTable::standard(), SchedulerOptions::default()).unwrap();
        advance(999).await;
        assert_eq!(scheduler.phase(), Phase::GatePass);
        advance(1).await;
        assert_eq!(scheduler.phase(), Phase::PathReveal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_timing() {
        let recorder = Recorder::default();
        let scheduler = PhaseScheduler::new(PhaseTable::standard(), recorder.options()).unwrap();

        advance(4000).await;
        assert!(!scheduler.is_complete());

        advance(500).await;
        assert_eq!(scheduler.phase(), Phase::Reveal);
        assert!(!scheduler.is_complete());
        assert_eq!(recorder.completions(), 0);

        advance(499).await;
        assert_eq!(recorder.completions(), 0);

        advance(1).await;
        assert!(scheduler.is_complete());
        assert_eq!(recorder.completions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_fires_at_most_once() {
        let recorder = Recorder::default();
        let scheduler = PhaseScheduler::new(PhaseTable::standard(), recorder.options()).unwrap();

        advance(5000).await;
        assert_eq!(recorder.completions(), 1);
        advance(5000).await;
        assert_eq!(recorder.completions(), 1);
        assert!(scheduler.is_complete());
        assert_eq!(scheduler.phase(), Phase::Reveal);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_large_jump_visits_every_phase_once() {
        let recorder = Recorder::default();
        let _scheduler = PhaseScheduler::new(PhaseTable::standard(), recorder.options()).unwrap();

        advance(10_000).await;
        assert_eq!(recorder.phases().len(), 4);
        assert_eq!(recorder.phases().last(), Some(&Phase::Reveal));
        assert_eq!(recorder.completions(), 1);
    }

    #[test]
    fn test_reduced_motion_completes_synchronously_without_runtime() {
        let recorder = Recorder::default();
        let scheduler = PhaseScheduler::new(
            PhaseTable::standard(),
            recorder.options().reduced_motion(true),
        )
        .unwrap();

        assert_eq!(scheduler.phase(), Phase::Reveal);
        assert!(scheduler.is_complete());
        assert_eq!(recorder.completions(), 1);
        assert!(recorder.phases().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reduced_motion_arms_no_timers() {
        let recorder = Recorder::default();
        let scheduler = PhaseScheduler::new(
            PhaseTable::standard(),
            recorder.options().reduced_motion(true),
        )
        .unwrap();

        advance(10_000).await;
        assert_eq!(scheduler.message_index(), 0);
        assert_eq!(recorder.completions(), 1);
        assert!(recorder.phases().is_empty());
    }

    #[test]
    fn test_outside_runtime_is_an_error() {
        let result = PhaseScheduler::new(PhaseTable::standard(), SchedulerOptions::default());
        assert!(matches!(result, Err(SchedulerError::RuntimeUnavailable)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_index_ticks() {
        let scheduler =
            PhaseScheduler::new(PhaseTable::standard(), SchedulerOptions::default()).unwrap();

        advance(500).await;
        assert_eq!(scheduler.message_index(), 1);
        advance(1000).await;
        assert_eq!(scheduler.message_index(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_index_keeps_growing_after_completion() {
        let scheduler =
            PhaseScheduler::new(PhaseTable::standard(), SchedulerOptions::default()).unwrap();

        advance(5000).await;
        assert_eq!(scheduler.message_index(), 10);
        advance(1000).await;
        assert_eq!(scheduler.message_index(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_message_interval() {
        let scheduler = PhaseScheduler::new(
            PhaseTable::standard(),
            SchedulerOptions::default().message_interval(ms(250)),
        )
        .unwrap();

        advance(1000).await;
        assert_eq!(scheduler.message_index(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_mid_sequence() {
        let recorder = Recorder::default();
        let scheduler = PhaseScheduler::new(PhaseTable::standard(), recorder.options()).unwrap();

        advance(2000).await;
        assert_eq!(scheduler.phase(), Phase::ContainerShake);

        scheduler.restart();
        assert_eq!(scheduler.phase(), Phase::GatePass);
        assert!(!scheduler.is_complete());
        assert_eq!(scheduler.message_index(), 0);
        assert_eq!(scheduler.generation(), 2);

        advance(1000).await;
        assert_eq!(scheduler.phase(), Phase::PathReveal);

        // The first run would have completed at t=5000; only the second
        // run's completion (at t=7000) may be observed.
        advance(2500).await;
        assert_eq!(recorder.completions(), 0);
        assert_eq!(scheduler.phase(), Phase::StickEject);

        advance(1500).await;
        assert_eq!(recorder.completions(), 1);
        advance(10_000).await;
        assert_eq!(recorder.completions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_completion_completes_again() {
        let recorder = Recorder::default();
        let scheduler = PhaseScheduler::new(PhaseTable::standard(), recorder.options()).unwrap();

        advance(5000).await;
        assert!(scheduler.is_complete());
        assert_eq!(recorder.completions(), 1);

        scheduler.restart();
        advance(1000).await;
        assert_eq!(scheduler.phase(), Phase::PathReveal);
        assert!(!scheduler.is_complete());

        advance(4000).await;
        assert!(scheduler.is_complete());
        assert_eq!(recorder.completions(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_restart_is_clean() {
        let recorder = Recorder::default();
        let scheduler = PhaseScheduler::new(PhaseTable::standard(), recorder.options()).unwrap();

        for _ in 0..5 {
            advance(300).await;
            scheduler.restart();
        }
        assert_eq!(scheduler.phase(), Phase::GatePass);
        assert_eq!(scheduler.message_index(), 0);

        advance(5000).await;
        assert_eq!(recorder.completions(), 1);
        assert_eq!(
            recorder.phases(),
            vec![
                Phase::PathReveal,
                Phase::ContainerShake,
                Phase::StickEject,
                Phase::Reveal
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_reduced_motion_plays_sequence() {
        let recorder = Recorder::default();
        let scheduler = PhaseScheduler::new(
            PhaseTable::standard(),
            recorder.options().reduced_motion(true),
        )
        .unwrap();
        assert_eq!(recorder.completions(), 1);

        scheduler.restart();
        assert_eq!(scheduler.phase(), Phase::GatePass);
        advance(5000).await;
        assert_eq!(recorder.completions(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timers() {
        let recorder = Recorder::default();
        let scheduler = PhaseScheduler::new(PhaseTable::standard(), recorder.options()).unwrap();

        advance(1000).await;
        let phases_before = recorder.phases().len();
        drop(scheduler);

        advance(10_000).await;
        assert_eq!(recorder.phases().len(), phases_before);
        assert_eq!(recorder.completions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_at_due_instant_wins() {
        let recorder = Recorder::default();
        let scheduler = PhaseScheduler::new(PhaseTable::standard(), recorder.options()).unwrap();

        advance(4999).await;
        // Move the clock past completion without letting the timer run.
        tokio::time::advance(ms(1)).await;
        scheduler.shutdown();
        settle().await;

        assert_eq!(recorder.completions(), 0);
        assert!(!scheduler.is_complete());
        assert!(scheduler.is_shut_down());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_shutdown_is_ignored() {
        let scheduler =
            PhaseScheduler::new(PhaseTable::standard(), SchedulerOptions::default()).unwrap();
        scheduler.shutdown();
        scheduler.shutdown();
        let generation = scheduler.generation();

        scheduler.restart();
        advance(2000).await;
        assert_eq!(scheduler.generation(), generation);
        assert_eq!(scheduler.phase(), Phase::GatePass);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_observes_changes() {
        let scheduler =
            PhaseScheduler::new(PhaseTable::standard(), SchedulerOptions::default()).unwrap();
        let mut rx = scheduler.subscribe();
        assert_eq!(*rx.borrow_and_update(), SchedulerSnapshot::initial());

        advance(1000).await;
        assert!(rx.has_changed().unwrap());
        let snapshot = *rx.borrow_and_update();
        assert_eq!(snapshot.phase, Phase::PathReveal);
        assert_eq!(snapshot.message_index, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extended_table_timing() {
        let recorder = Recorder::default();
        let scheduler = PhaseScheduler::new(PhaseTable::extended(), recorder.options()).unwrap();

        advance(3999).await;
        assert_eq!(scheduler.phase(), Phase::GatePass);
        advance(1).await;
        assert_eq!(scheduler.phase(), Phase::PathReveal);
        advance(3000).await;
        assert_eq!(scheduler.phase(), Phase::Reveal);
        assert!(!scheduler.is_complete());
        advance(500).await;
        assert!(scheduler.is_complete());
        assert_eq!(recorder.completions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_from_callback_does_not_deadlock() {
        let handle: Arc<std::sync::OnceLock<Weak<PhaseScheduler>>> = Arc::default();
        let restarted = Arc::new(AtomicBool::new(false));
        let completions = Arc::new(AtomicUsize::new(0));

        let options = {
            let handle = Arc::clone(&handle);
            let restarted = Arc::clone(&restarted);
            let completions = Arc::clone(&completions);
            SchedulerOptions::default().on_complete(move || {
                completions.fetch_add(1, Ordering::SeqCst);
                if !restarted.swap(true, Ordering::SeqCst) {
                    if let Some(scheduler) = handle.get().and_then(Weak::upgrade) {
                        scheduler.restart();
                    }
                }
            })
        };

        let scheduler = Arc::new(PhaseScheduler::new(PhaseTable::standard(), options).unwrap());
        handle.set(Arc::downgrade(&scheduler)).unwrap();

        advance(5000).await;
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.phase(), Phase::GatePass);
        assert_eq!(scheduler.generation(), 2);

        advance(5000).await;
        assert_eq!(completions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_from_callback_does_not_deadlock() {
        let handle: Arc<std::sync::OnceLock<Weak<PhaseScheduler>>> = Arc::default();
        let recorder = Recorder::default();

        let options = {
            let handle = Arc::clone(&handle);
            recorder.options().on_phase_change({
                let phases = Arc::clone(&recorder.phases);
                move |p| {
                    phases.lock().unwrap().push(p);
                    if let Some(scheduler) = handle.get().and_then(Weak::upgrade) {
                        scheduler.shutdown();
                    }
                }
            })
        };

        let scheduler = Arc::new(PhaseScheduler::new(PhaseTable::standard(), options).unwrap());
        handle.set(Arc::downgrade(&scheduler)).unwrap();

        advance(1000).await;
        assert!(scheduler.is_shut_down());
        assert_eq!(recorder.phases(), vec![Phase::PathReveal]);

        advance(10_000).await;
        assert_eq!(recorder.phases(), vec![Phase::PathReveal]);
        assert_eq!(recorder.completions(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_waits_for_in_flight_callback() {
        let entered = Arc::new(AtomicBool::new(false));
        let returned = Arc::new(AtomicBool::new(false));
        let calls = Arc::new(AtomicUsize::new(0));

        let options = SchedulerOptions::default().on_phase_change({
            let entered = Arc::clone(&entered);
            let returned = Arc::clone(&returned);
            let calls = Arc::clone(&calls);
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                entered.store(true, Ordering::SeqCst);
                std::thread::sleep(ms(100));
                returned.store(true, Ordering::SeqCst);
            }
        });
        let table = PhaseTable::from_durations([ms(10); 5]).unwrap();
        let scheduler = PhaseScheduler::new(table, options).unwrap();

        while !entered.load(Ordering::SeqCst) {
            tokio::time::sleep(ms(1)).await;
        }
        scheduler.shutdown();
        assert!(returned.load(Ordering::SeqCst));

        let seen = calls.load(Ordering::SeqCst);
        tokio::time::sleep(ms(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_restart_waits_for_in_flight_callback() {
        let entered = Arc::new(AtomicBool::new(false));
        let returned = Arc::new(AtomicBool::new(false));

        let options = SchedulerOptions::default().on_phase_change({
            let entered = Arc::clone(&entered);
            let returned = Arc::clone(&returned);
            move |_| {
                if !entered.swap(true, Ordering::SeqCst) {
                    std::thread::sleep(ms(100));
                    returned.store(true, Ordering::SeqCst);
                }
            }
        });
        let table = PhaseTable::from_durations([ms(10); 5]).unwrap();
        let scheduler = PhaseScheduler::new(table, options).unwrap();

        while !entered.load(Ordering::SeqCst) {
            tokio::time::sleep(ms(1)).await;
        }
        scheduler.restart();
        assert!(returned.load(Ordering::SeqCst));
        assert_eq!(scheduler.generation(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debug_output() {
        let scheduler =
            PhaseScheduler::new(PhaseTable::standard(), SchedulerOptions::default()).unwrap();
        let debug = format!("{scheduler:?}");
        assert!(debug.contains("PhaseScheduler"));
        assert!(debug.contains("GatePass"));
        let options = format!("{:?}", SchedulerOptions::default());
        assert!(options.contains("reduced_motion: false"));
    }
}
