//! Periodic countdown and message polling.
//!
//! Two loops run independently. Each one sleeps on the tracker's status
//! channel while it has nothing to do and wakes as soon as a state change
//! makes it relevant again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::ScheduleConfig;
use crate::relay::CommandRelay;
use crate::store::KeyValueStore;
use crate::tracker::{PollOutcome, Tracker, TrackerStatus};

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Tick,
    Poll,
}

impl Trigger {
    const fn name(self) -> &'static str {
        match self {
            Self::Tick => "ticker",
            Self::Poll => "poller",
        }
    }

    const fn active(self, status: &TrackerStatus) -> bool {
        match self {
            Self::Tick => status.ticker_active(),
            Self::Poll => status.poller_active(),
        }
    }
}

/// Handle to the running loops. Dropping it without [`Scheduler::shutdown`]
/// leaves the loops running until the runtime stops.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the ticker and the poller for `tracker`.
    #[must_use]
    pub fn start<R, S, C>(tracker: &Arc<Tracker<R, S, C>>, config: &ScheduleConfig) -> Self
    where
        R: CommandRelay + 'static,
        S: KeyValueStore + 'static,
        C: Clock + 'static,
    {
        let (shutdown, _) = watch::channel(false);
        let handles = [
            (Trigger::Tick, config.tick_interval()),
            (Trigger::Poll, config.poll_interval()),
        ]
        .into_iter()
        .map(|(trigger, period)| {
            tokio::spawn(run(
                trigger,
                Arc::clone(tracker),
                period,
                shutdown.subscribe(),
            ))
        })
        .collect();

        Self { shutdown, handles }
    }

    /// Stop both loops and wait for them to finish.
    pub async fn shutdown(self) {
        self.shutdown.send_replace(true);
        for handle in self.handles {
            if let Err(err) = handle.await {
                warn!("scheduler task ended abnormally: {err}");
            }
        }
    }
}

async fn run<R, S, C>(
    trigger: Trigger,
    tracker: Arc<Tracker<R, S, C>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    R: CommandRelay,
    S: KeyValueStore,
    C: Clock,
{
    let mut status = tracker.subscribe();

    while !*shutdown.borrow() {
        if !trigger.active(&status.borrow_and_update()) {
            tokio::select! {
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
                _ = shutdown.changed() => break,
            }
            continue;
        }

        debug!(period_ms = period.as_millis(), "{} active", trigger.name());
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => {},
                _ = shutdown.changed() => return,
            }
            if !trigger.active(&tracker.status()) {
                break;
            }
            match trigger {
                Trigger::Tick => {
                    tracker.tick().await;
                },
                Trigger::Poll => {
                    let received = tracker
                        .poll_waiting()
                        .await
                        .into_iter()
                        .filter(|(_, outcome)| matches!(outcome, PollOutcome::Received(_)))
                        .count();
                    debug!(received, "poll round finished");
                },
            }
        }
        debug!("{} idle", trigger.name());
    }
}
