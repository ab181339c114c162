//! Background scheduler for reconciliation passes.
//!
//! Runs the sync function on an interval with:
//! - Jitter so several sites do not hit the provider at once
//! - Exponential backoff on hard failures
//! - Pause, resume, run-now and stop commands
//!
//! Every pass receives a child of the scheduler's cancellation token, so a
//! stop request interrupts the pass that is running.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Base interval between passes.
    pub sync_interval: Duration,
    /// Maximum jitter added to the interval (fraction 0.0-1.0).
    pub jitter_fraction: f64,
    /// Initial backoff duration on error.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub backoff_multiplier: f64,
    /// Consecutive failures after which passes are skipped.
    pub max_consecutive_failures: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(3600),
            jitter_fraction: 0.1,
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(1800),
            backoff_multiplier: 2.0,
            max_consecutive_failures: 10,
        }
    }
}

impl SchedulerConfig {
    /// Creates a config with the given interval.
    pub fn new(sync_interval: Duration) -> Self {
        Self {
            sync_interval,
            ..Default::default()
        }
    }

    /// Builder: set jitter fraction.
    pub fn with_jitter(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Builder: set backoff parameters.
    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self.backoff_multiplier = multiplier;
        self
    }

    /// Next delay, interval plus or minus jitter.
    pub fn next_sync_delay(&self) -> Duration {
        let base = self.sync_interval.as_secs_f64();
        let range = base * self.jitter_fraction;
        let jitter = if range > 0.0 {
            rand::rng().random_range(-range..=range)
        } else {
            0.0
        };
        Duration::from_secs_f64((base + jitter).max(0.0))
    }

    /// Backoff delay after `consecutive_failures` failures.
    pub fn backoff_delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_backoff.as_secs_f64();
        let multiplier = self
            .backoff_multiplier
            .powi(consecutive_failures as i32 - 1);
        let delay = base * multiplier;
        let max = self.max_backoff.as_secs_f64();

        Duration::from_secs_f64(delay.min(max))
    }
}

/// Commands accepted by a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Run a pass now.
    SyncNow,
    /// Skip timed passes until resumed.
    Pause,
    /// Resume timed passes.
    Resume,
    /// Stop the loop.
    Stop,
}

/// Scheduler state.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    /// Whether timed passes are skipped.
    pub paused: bool,
    /// Number of consecutive failed passes.
    pub consecutive_failures: u32,
    /// Number of passes run.
    pub passes: u64,
    /// Last successful pass.
    pub last_sync: Option<DateTime<Utc>>,
    /// Last pass attempt.
    pub last_attempt: Option<DateTime<Utc>>,
    /// Last error message.
    pub last_error: Option<String>,
}

impl SchedulerState {
    /// Creates an idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful pass.
    pub fn record_success(&mut self) {
        self.passes += 1;
        self.consecutive_failures = 0;
        self.last_sync = Some(Utc::now());
        self.last_attempt = self.last_sync;
        self.last_error = None;
    }

    /// Records a failed pass.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.passes += 1;
        self.consecutive_failures += 1;
        self.last_attempt = Some(Utc::now());
        self.last_error = Some(error.into());
    }
}

/// Shared scheduler state.
pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

/// Runs the sync function periodically.
pub struct Scheduler {
    config: SchedulerConfig,
    state: SharedSchedulerState,
    cancel: CancellationToken,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: Option<mpsc::Receiver<SchedulerCommand>>,
}

impl Scheduler {
    /// Creates a scheduler with the given configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            state: Arc::new(RwLock::new(SchedulerState::new())),
            cancel: CancellationToken::new(),
            command_tx,
            command_rx: Some(command_rx),
        }
    }

    /// Returns a handle for sending commands to the scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Returns the shared state.
    pub fn state(&self) -> SharedSchedulerState {
        self.state.clone()
    }

    /// Runs the loop until stopped.
    ///
    /// `sync_fn` gets a token that is cancelled when the scheduler stops; a
    /// pass should return promptly once it fires.
    pub async fn run<F, Fut>(mut self, sync_fn: F)
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send,
    {
        let Some(mut command_rx) = self.command_rx.take() else {
            return;
        };

        info!(
            interval_secs = self.config.sync_interval.as_secs(),
            "Scheduler started"
        );

        self.do_sync(&sync_fn).await;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            let delay = self.calculate_next_delay().await;
            debug!(delay_secs = delay.as_secs(), "Scheduling next pass");

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Scheduler cancelled");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    if self.state.read().await.paused {
                        debug!("Scheduler paused, skipping pass");
                        continue;
                    }
                    self.do_sync(&sync_fn).await;
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::SyncNow) => {
                            debug!("Received SyncNow command");
                            self.do_sync(&sync_fn).await;
                        }
                        Some(SchedulerCommand::Pause) => {
                            info!("Scheduler paused");
                            self.state.write().await.paused = true;
                        }
                        Some(SchedulerCommand::Resume) => {
                            info!("Scheduler resumed");
                            self.state.write().await.paused = false;
                        }
                        Some(SchedulerCommand::Stop) | None => {
                            info!("Scheduler stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn calculate_next_delay(&self) -> Duration {
        let state = self.state.read().await;
        if state.consecutive_failures > 0 {
            let backoff = self.config.backoff_delay(state.consecutive_failures);
            debug!(
                failures = state.consecutive_failures,
                backoff_secs = backoff.as_secs(),
                "Using backoff delay"
            );
            return backoff;
        }
        self.config.next_sync_delay()
    }

    async fn do_sync<F, Fut>(&self, sync_fn: &F)
    where
        F: Fn(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), String>>,
    {
        let failures = self.state.read().await.consecutive_failures;
        if failures >= self.config.max_consecutive_failures {
            error!(
                failures,
                max = self.config.max_consecutive_failures,
                "Max consecutive failures reached, skipping pass"
            );
            return;
        }

        debug!("Starting pass");
        match sync_fn(self.cancel.child_token()).await {
            Ok(()) => {
                info!("Pass completed");
                self.state.write().await.record_success();
            }
            Err(e) => {
                warn!(error = %e, "Pass failed");
                self.state.write().await.record_failure(e);
            }
        }
    }
}

/// Handle for controlling a running scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedSchedulerState,
    cancel: CancellationToken,
}

type SendResult = Result<(), mpsc::error::SendError<SchedulerCommand>>;

impl SchedulerHandle {
    /// Runs a pass now.
    pub async fn sync_now(&self) -> SendResult {
        self.command_tx.send(SchedulerCommand::SyncNow).await
    }

    /// Pauses timed passes.
    pub async fn pause(&self) -> SendResult {
        self.command_tx.send(SchedulerCommand::Pause).await
    }

    /// Resumes timed passes.
    pub async fn resume(&self) -> SendResult {
        self.command_tx.send(SchedulerCommand::Resume).await
    }

    /// Cancels the running pass and stops the loop.
    pub fn stop(&self) {
        self.cancel.cancel();
        // The loop may already be gone, and cancellation alone stops it.
        let _ = self.command_tx.try_send(SchedulerCommand::Stop);
    }

    /// Returns a snapshot of the scheduler state.
    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }

    /// Returns true if timed passes are paused.
    pub async fn is_paused(&self) -> bool {
        self.state.read().await.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.sync_interval, Duration::from_secs(3600));
        assert!(config.jitter_fraction > 0.0);
    }

    #[test]
    fn config_next_sync_delay() {
        let config = SchedulerConfig::new(Duration::from_secs(60)).with_jitter(0.1);
        for _ in 0..20 {
            let delay = config.next_sync_delay();
            assert!(delay.as_secs_f64() >= 54.0);
            assert!(delay.as_secs_f64() <= 66.0);
        }
    }

    #[test]
    fn config_without_jitter_is_exact() {
        let config = SchedulerConfig::new(Duration::from_secs(60)).with_jitter(0.0);
        assert_eq!(config.next_sync_delay(), Duration::from_secs(60));
    }

    #[test]
    fn config_backoff_delay() {
        let config = SchedulerConfig::default().with_backoff(
            Duration::from_secs(5),
            Duration::from_secs(300),
            2.0,
        );

        assert_eq!(config.backoff_delay(0), Duration::ZERO);
        assert_eq!(config.backoff_delay(1), Duration::from_secs(5));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(10));
        assert_eq!(config.backoff_delay(3), Duration::from_secs(20));
        assert_eq!(config.backoff_delay(10), Duration::from_secs(300));
    }

    #[test]
    fn state_records() {
        let mut state = SchedulerState::new();
        state.record_failure("provider down");
        assert_eq!(state.consecutive_failures, 1);
        assert_eq!(state.last_error.as_deref(), Some("provider down"));
        assert!(state.last_sync.is_none());

        state.record_success();
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.passes, 2);
        assert!(state.last_sync.is_some());
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn scheduler_commands() {
        let scheduler = Scheduler::new(SchedulerConfig::new(Duration::from_secs(60)));
        let handle = scheduler.handle();

        let count = Arc::new(AtomicU32::new(0));
        let counter = count.clone();
        let task = tokio::spawn(scheduler.run(move |_cancel| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(count.load(Ordering::SeqCst) >= 1);

        handle.sync_now().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(count.load(Ordering::SeqCst) >= 2);

        handle.pause().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.is_paused().await);

        handle.resume().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_paused().await);

        handle.stop();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn scheduler_backoff_on_failure() {
        let config = SchedulerConfig::new(Duration::from_secs(1)).with_backoff(
            Duration::from_millis(10),
            Duration::from_millis(100),
            2.0,
        );
        let scheduler = Scheduler::new(config);
        let state = scheduler.state();
        let handle = scheduler.handle();

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let task = tokio::spawn(scheduler.run(move |_cancel| {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 3 {
                    Err(format!("Failure {}", n))
                } else {
                    Ok(())
                }
            }
        }));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(attempts.load(Ordering::SeqCst) >= 4);
        assert_eq!(state.read().await.consecutive_failures, 0);

        handle.stop();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn stop_cancels_running_pass() {
        let scheduler = Scheduler::new(SchedulerConfig::new(Duration::from_secs(60)));
        let handle = scheduler.handle();
        let state = scheduler.state();

        let task = tokio::spawn(scheduler.run(|cancel: CancellationToken| async move {
            cancel.cancelled().await;
            Err::<(), String>("cancelled".to_string())
        }));

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.stop();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("scheduler did not stop")
            .unwrap();
        assert_eq!(state.read().await.last_error.as_deref(), Some("cancelled"));
    }
}
