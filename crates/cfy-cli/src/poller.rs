//! Waiting for executions to finish.
//!
//! Each cycle first flushes new events, then reads the execution status.
//! A terminal status triggers one final flush so events written just before
//! the status change are not lost.
//!
//! ```text
//!        ┌──────────── sleep(poll_interval) ◄───────────┐
//!        ▼                                               │
//!  flush events ──► get status ──► terminal? ── no ──► timed out? ── no
//!                                     │ yes                  │ yes
//!                                     ▼                      ▼
//!                            final flush, return       Timeout error
//! ```

use std::cell::Cell;
use std::time::{Duration, Instant};

use cfy_rest::{Event, Execution, ExecutionId, ExecutionStatus, ManagerClient};
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_BATCH_SIZE, DEFAULT_POLL_INTERVAL_SECS};
use crate::error::CliError;
use crate::events::{Cursor, EventFetcher};

// ============================================================================
// Clock
// ============================================================================

/// Source of monotonic time and sleeping.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Block for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// A clock whose origin is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Clock that only moves when slept on.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
    sleeps: Cell<u32>,
}

impl ManualClock {
    /// A clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without counting a sleep.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Number of sleeps so far.
    #[must_use]
    pub fn sleeps(&self) -> u32 {
        self.sleeps.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.advance(duration);
    }
}

impl<K: Clock + ?Sized> Clock for &K {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

// ============================================================================
// Poller
// ============================================================================

/// Polling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Delay between cycles.
    pub poll_interval: Duration,
    /// Events requested per page.
    pub batch_size: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Outcome of one status read.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStep {
    /// Still running. `None` when the status could not be read this cycle.
    Pending(Option<Execution>),
    /// Finished without failure (`terminated` or `cancelled`).
    Terminal(Execution),
    /// Finished with `failed`.
    Failed(Execution),
}

impl From<Execution> for PollStep {
    fn from(execution: Execution) -> Self {
        match execution.status {
            ExecutionStatus::Failed => Self::Failed(execution),
            status if status.is_terminal() => Self::Terminal(execution),
            _ => Self::Pending(Some(execution)),
        }
    }
}

/// State of one wait.
#[derive(Debug)]
struct PollSession {
    execution_id: ExecutionId,
    started_at: Duration,
    timeout: Option<Duration>,
    last_status: Option<ExecutionStatus>,
    cursor: Cursor,
    cycles: u32,
}

impl PollSession {
    fn new(execution_id: ExecutionId, started_at: Duration, timeout: Option<Duration>) -> Self {
        Self {
            execution_id,
            started_at,
            timeout: timeout.filter(|t| !t.is_zero()),
            last_status: None,
            cursor: Cursor::default(),
            cycles: 0,
        }
    }

    fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.started_at)
    }

    fn expired(&self, now: Duration) -> bool {
        self.timeout.is_some_and(|t| self.elapsed(now) >= t)
    }

    fn observe(&mut self, status: ExecutionStatus) {
        if self.last_status != Some(status) {
            info!(execution_id = %self.execution_id, %status, "execution status changed");
            self.last_status = Some(status);
        }
    }
}

/// Waits for executions to reach a terminal status, streaming their events.
#[derive(Debug)]
pub struct ExecutionPoller<'a, C: ?Sized, K = SystemClock> {
    client: &'a C,
    clock: K,
    config: PollerConfig,
}

impl<'a, C: ManagerClient + ?Sized> ExecutionPoller<'a, C, SystemClock> {
    /// A poller on the system clock.
    #[must_use]
    pub fn new(client: &'a C, config: PollerConfig) -> Self {
        Self::with_clock(client, config, SystemClock::new())
    }
}

impl<'a, C: ManagerClient + ?Sized, K: Clock> ExecutionPoller<'a, C, K> {
    /// A poller on the given clock.
    #[must_use]
    pub const fn with_clock(client: &'a C, config: PollerConfig, clock: K) -> Self {
        Self {
            client,
            clock,
            config,
        }
    }

    /// Block until `execution_id` finishes, handing each cycle's new events
    /// to `on_events` in order.
    ///
    /// A `timeout` of `None` or zero waits forever. Transport errors are
    /// logged and retried on the next cycle.
    ///
    /// # Errors
    ///
    /// - [`CliError::NotFound`] if the execution does not exist.
    /// - [`CliError::ExecutionFailed`] if it ends in `failed`.
    /// - [`CliError::Timeout`] if `timeout` elapses first, or the transport
    ///   error of the status read in the cycle that crossed the timeout.
    /// - Any error returned by `on_events`.
    pub fn wait_for_execution<F>(
        &self,
        execution_id: &ExecutionId,
        timeout: Option<Duration>,
        include_logs: bool,
        mut on_events: F,
    ) -> Result<Execution, CliError>
    where
        F: FnMut(&[Event]) -> Result<(), CliError>,
    {
        let fetcher = EventFetcher::new(self.client, self.config.batch_size, include_logs);
        let mut session = PollSession::new(execution_id.clone(), self.clock.now(), timeout);

        match self.client.get_execution(execution_id) {
            Ok(execution) => session.observe(execution.status),
            Err(err) if err.is_transient() => {
                warn!(%execution_id, error = %err, "could not verify execution, will retry");
            }
            Err(err) => return Err(err.into()),
        }

        loop {
            session.cycles += 1;
            self.flush(&fetcher, &mut session, &mut on_events)?;

            let step = match self.client.get_execution(execution_id) {
                Ok(execution) => PollStep::from(execution),
                Err(err) if err.is_transient() => {
                    if session.expired(self.clock.now()) {
                        return Err(err.into());
                    }
                    warn!(%execution_id, error = %err, "status poll failed, will retry");
                    PollStep::Pending(None)
                }
                Err(err) => return Err(err.into()),
            };

            match step {
                PollStep::Terminal(execution) => {
                    session.observe(execution.status);
                    self.final_flush(&fetcher, &mut session, &mut on_events)?;
                    return Ok(execution);
                }
                PollStep::Failed(execution) => {
                    session.observe(execution.status);
                    self.final_flush(&fetcher, &mut session, &mut on_events)?;
                    return Err(CliError::ExecutionFailed {
                        execution_id: execution.id,
                        error: execution
                            .error
                            .unwrap_or_else(|| "no error details reported".to_string()),
                    });
                }
                PollStep::Pending(snapshot) => {
                    if let Some(execution) = snapshot {
                        session.observe(execution.status);
                    }
                }
            }

            let now = self.clock.now();
            if session.expired(now) {
                return Err(CliError::Timeout {
                    execution_id: execution_id.clone(),
                    elapsed: session.elapsed(now),
                });
            }

            debug!(
                %execution_id,
                cycle = session.cycles,
                from_event = session.cursor.from_event(),
                "waiting for next poll"
            );
            self.clock.sleep(self.config.poll_interval);
        }
    }

    /// Deliver new events; transport errors leave the cursor for next cycle.
    fn flush<F>(
        &self,
        fetcher: &EventFetcher<'_, C>,
        session: &mut PollSession,
        on_events: &mut F,
    ) -> Result<(), CliError>
    where
        F: FnMut(&[Event]) -> Result<(), CliError>,
    {
        match fetcher.fetch_new(&session.execution_id, session.cursor) {
            Ok((events, cursor)) => {
                session.cursor = cursor;
                if !events.is_empty() {
                    on_events(&events)?;
                }
                Ok(())
            }
            Err(err) if err.is_transient() => {
                warn!(
                    execution_id = %session.execution_id,
                    error = %err,
                    "event fetch failed, will retry"
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn final_flush<F>(
        &self,
        fetcher: &EventFetcher<'_, C>,
        session: &mut PollSession,
        on_events: &mut F,
    ) -> Result<(), CliError>
    where
        F: FnMut(&[Event]) -> Result<(), CliError>,
    {
        self.flush(fetcher, session, on_events)?;
        debug!(
            execution_id = %session.execution_id,
            cycles = session.cycles,
            events = session.cursor.from_event(),
            "execution finished"
        );
        Ok(())
    }
}
