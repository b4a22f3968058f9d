//! Lifecycle tracking for reserved numbers.
//!
//! The tracker owns the in-memory reservation list and mirrors it to the
//! store after every mutation. State lives behind a short-lived lock that is
//! never held across a relay call: each action checks and marks the record,
//! releases the lock, talks to the provider, then re-acquires the lock and
//! applies its result to whatever the list looks like at that point.

use std::collections::HashSet;

use futures::future::join_all;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::relay::{Command, CommandRelay, Credentials, RelayRequest};
use crate::store::{KeyValueStore, StoreKey, load_requests, save_requests};
use crate::types::{
    CANCELLED_NOTE, Mode, NumberRequest, Reservation, decode_sms, remaining_seconds_at,
};
use crate::validation::{LocationFilter, validate_service};
use crate::{Error, Result};

/// Snapshot driving the periodic triggers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStatus {
    /// Records currently in `waiting`.
    pub waiting: usize,
    /// Whether credentials are set.
    pub logged_in: bool,
}

impl TrackerStatus {
    /// The countdown runs while anything is waiting.
    #[must_use]
    pub const fn ticker_active(&self) -> bool {
        self.waiting > 0
    }

    /// Polling additionally needs credentials.
    #[must_use]
    pub const fn poller_active(&self) -> bool {
        self.logged_in && self.waiting > 0
    }
}

/// Result of one poll attempt. Polling never fails the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A message arrived and the record moved to `message`.
    Received(String),
    /// The provider had nothing yet.
    NoMessage,
    /// The record was not eligible, or stopped waiting while the call ran.
    Skipped,
    /// Provider or transport failure, ignored.
    Failed(String),
}

#[derive(Default)]
struct TrackerState {
    records: Vec<NumberRequest>,
    pending: HashSet<u64>,
    credentials: Option<Credentials>,
    /// Bumped by every sign-out; results from an older session are dropped.
    session: u64,
}

impl TrackerState {
    fn find(&self, id: u64) -> Result<&NumberRequest> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("no tracked number with id {id}")))
    }

    fn credentials(&self) -> Result<Credentials> {
        self.credentials
            .clone()
            .ok_or_else(|| Error::InvalidState("Please log in first.".into()))
    }

    fn status(&self) -> TrackerStatus {
        TrackerStatus {
            waiting: self.records.iter().filter(|r| r.is_waiting()).count(),
            logged_in: self.credentials.is_some(),
        }
    }

    fn signed_in(&self) -> Result<(Credentials, u64)> {
        Ok((self.credentials()?, self.session))
    }

    fn ensure_session(&self, session: u64) -> Result<()> {
        if self.session != session {
            return Err(Error::InvalidState(
                "Signed out while the request was in flight; the result was discarded.".into(),
            ));
        }
        Ok(())
    }

    fn ensure_untracked(&self, id: u64) -> Result<()> {
        if self.records.iter().any(|r| r.id == id) {
            return Err(Error::UnexpectedResponse(format!(
                "provider returned id {id}, which is already tracked"
            )));
        }
        Ok(())
    }

    fn claim(&mut self, id: u64) -> Result<()> {
        if !self.pending.insert(id) {
            return Err(Error::InvalidState(
                "Another action is already in progress for this number.".into(),
            ));
        }
        Ok(())
    }
}

/// Owns reservations and performs every action on them.
pub struct Tracker<R, S, C> {
    relay: R,
    store: S,
    clock: C,
    state: Mutex<TrackerState>,
    status: watch::Sender<TrackerStatus>,
}

impl<R, S, C> Tracker<R, S, C>
where
    R: CommandRelay,
    S: KeyValueStore,
    C: Clock,
{
    /// Empty tracker without credentials.
    pub fn new(relay: R, store: S, clock: C) -> Self {
        let (status, _) = watch::channel(TrackerStatus::default());
        Self {
            relay,
            store,
            clock,
            state: Mutex::new(TrackerState::default()),
            status,
        }
    }

    /// Tracker seeded from the store.
    ///
    /// Countdowns are recomputed from the clock and records whose reservation
    /// lapsed while nothing was running are downgraded to `expired`.
    pub fn restore(relay: R, store: S, clock: C) -> Result<Self> {
        let records = load_requests(&store, clock.now_millis())?;
        let waiting = records.iter().filter(|r| r.is_waiting()).count();
        info!(count = records.len(), waiting, "restored reservations");

        if let Err(err) = save_requests(&store, &records) {
            warn!("failed to write restored reservations: {err}");
        }

        let (status, _) = watch::channel(TrackerStatus {
            waiting,
            logged_in: false,
        });
        Ok(Self {
            relay,
            store,
            clock,
            state: Mutex::new(TrackerState {
                records,
                ..TrackerState::default()
            }),
            status,
        })
    }

    /// Set the account used for every relay call.
    pub async fn sign_in(&self, credentials: Credentials) {
        let mut state = self.state.lock().await;
        debug!(user = credentials.user(), "tracker signed in");
        state.credentials = Some(credentials);
        self.publish(&state);
    }

    /// Drop credentials and every record, including the stored list.
    pub async fn sign_out(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.credentials = None;
        state.records.clear();
        state.pending.clear();
        state.session = state.session.wrapping_add(1);
        self.publish(&state);
        self.store.remove(StoreKey::Requests)
    }

    /// Records in display order, newest first.
    pub async fn records(&self) -> Vec<NumberRequest> {
        self.state.lock().await.records.clone()
    }

    /// One record by id.
    pub async fn get(&self, id: u64) -> Option<NumberRequest> {
        self.state.lock().await.find(id).ok().cloned()
    }

    /// Current trigger status.
    #[must_use]
    pub fn status(&self) -> TrackerStatus {
        *self.status.borrow()
    }

    /// Receiver notified whenever [`TrackerStatus`] changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TrackerStatus> {
        self.status.subscribe()
    }

    /// Reserve a number for `service`, optionally constrained by `filter`.
    ///
    /// The new record is placed first. Nothing is recorded on failure, when
    /// the provider hands back an id that is already tracked, or when the
    /// session was signed out while the call ran.
    pub async fn request_number(
        &self,
        service: &str,
        filter: &LocationFilter,
    ) -> Result<NumberRequest> {
        let service = validate_service(service)?;
        let (credentials, session) = self.state.lock().await.signed_in()?;

        let mut request = RelayRequest::new(Command::Request).param("service", service);
        if let Some((key, value)) = filter.as_param() {
            request = request.param(key, value);
        }

        let payload = self.relay.execute(&credentials, &request).await?;
        let reservation = Reservation::from_payload(&payload, service, None)?;
        let record = NumberRequest::from_reservation(reservation, self.clock.now_millis());

        let mut state = self.state.lock().await;
        state.ensure_session(session)?;
        state.ensure_untracked(record.id)?;
        state.records.insert(0, record.clone());
        self.commit(&state);

        info!(
            id = record.id,
            number = %record.phone_number,
            service = %record.service_name,
            ttl = record.seconds_until_expiration,
            "number reserved"
        );
        Ok(record)
    }

    /// Release a waiting number early.
    pub async fn cancel(&self, id: u64) -> Result<()> {
        let credentials = {
            let mut state = self.state.lock().await;
            let record = state.find(id)?;
            if record.mode != Mode::Waiting {
                return Err(Error::InvalidState(format!(
                    "Only waiting numbers can be cancelled; {id} is {}.",
                    record.mode
                )));
            }
            let credentials = state.credentials()?;
            state.claim(id)?;
            credentials
        };

        let request = RelayRequest::new(Command::Reject).param("id", id.to_string());
        let outcome = self.relay.execute(&credentials, &request).await;

        let mut state = self.state.lock().await;
        state.pending.remove(&id);
        outcome?;

        for record in state.records.iter_mut().filter(|r| r.id == id) {
            if record.mode == Mode::Message {
                continue;
            }
            record.mode = Mode::Expired;
            record.remaining_seconds = 0;
            record.sms_text = Some(CANCELLED_NOTE.to_string());
        }
        self.commit(&state);
        info!(id, "number cancelled");
        Ok(())
    }

    /// Request the same number again after it received a message.
    ///
    /// The source record keeps its message; a new record with its own id is
    /// placed first.
    pub async fn reactivate(&self, id: u64) -> Result<NumberRequest> {
        let (credentials, session, source) = {
            let mut state = self.state.lock().await;
            let source = state.find(id)?.clone();
            if source.mode != Mode::Message {
                return Err(Error::InvalidState(format!(
                    "Only numbers that received a message can be reactivated; {id} is {}.",
                    source.mode
                )));
            }
            let (credentials, session) = state.signed_in()?;
            state.claim(id)?;
            (credentials, session, source)
        };

        let request = RelayRequest::new(Command::Request)
            .param("service", source.service_name.as_str())
            .param("mdn", source.phone_number.as_str());
        let outcome = self.relay.execute(&credentials, &request).await;

        let mut state = self.state.lock().await;
        state.pending.remove(&id);
        state.ensure_session(session)?;
        let payload = outcome?;

        let mut reservation = Reservation::from_payload(&payload, &source.service_name, Some(&source))?;
        state.ensure_untracked(reservation.id)?;
        reservation.service.clone_from(&source.service_name);

        let record = NumberRequest::from_reservation(reservation, self.clock.now_millis());
        state.records.insert(0, record.clone());
        self.commit(&state);

        info!(source = id, id = record.id, "number reactivated");
        Ok(record)
    }

    /// Ask the provider whether a waiting number received an SMS.
    ///
    /// Failures and empty answers leave the record untouched. A result that
    /// arrives after the record stopped waiting is discarded.
    pub async fn poll_for_message(&self, id: u64) -> PollOutcome {
        let (credentials, service, number) = {
            let state = self.state.lock().await;
            let Some(credentials) = state.credentials.clone() else {
                return PollOutcome::Skipped;
            };
            match state.find(id) {
                Ok(record) if record.is_waiting() && !state.pending.contains(&id) => (
                    credentials,
                    record.service_name.clone(),
                    record.phone_number.clone(),
                ),
                _ => return PollOutcome::Skipped,
            }
        };

        let request = RelayRequest::new(Command::ReadSms)
            .param("service", service)
            .param("mdn", number);
        let payload = match self.relay.execute(&credentials, &request).await {
            Ok(payload) => payload,
            Err(err) => {
                debug!(id, category = err.category(), "poll ignored: {err}");
                return PollOutcome::Failed(err.to_string());
            },
        };

        let Some(text) = decode_sms(&payload) else {
            return PollOutcome::NoMessage;
        };

        let mut state = self.state.lock().await;
        let Some(record) = state
            .records
            .iter_mut()
            .find(|r| r.id == id && r.is_waiting())
        else {
            debug!(id, "discarding message for a record that is no longer waiting");
            return PollOutcome::Skipped;
        };
        record.mode = Mode::Message;
        record.sms_text = Some(text.clone());
        self.commit(&state);

        info!(id, "message received");
        PollOutcome::Received(text)
    }

    /// Poll every waiting record concurrently.
    pub async fn poll_waiting(&self) -> Vec<(u64, PollOutcome)> {
        let ids: Vec<u64> = {
            let state = self.state.lock().await;
            state
                .records
                .iter()
                .filter(|r| r.is_waiting() && !state.pending.contains(&r.id))
                .map(|r| r.id)
                .collect()
        };

        join_all(ids.into_iter().map(|id| async move {
            (id, self.poll_for_message(id).await)
        }))
        .await
    }

    /// Recompute every waiting countdown from the clock.
    ///
    /// Records reaching zero become `expired` without contacting the
    /// provider. Returns how many records expired on this call. Repeated
    /// calls within the same second change nothing.
    pub async fn tick(&self) -> usize {
        let now = self.clock.now_millis();
        let mut state = self.state.lock().await;

        let mut expired = 0;
        for record in state.records.iter_mut().filter(|r| r.is_waiting()) {
            record.remaining_seconds = remaining_seconds_at(record.expires_at, now);
            if record.remaining_seconds == 0 {
                record.mode = Mode::Expired;
                expired += 1;
                info!(id = record.id, "reservation expired");
            }
        }

        if expired > 0 {
            self.commit(&state);
        }
        expired
    }

    fn commit(&self, state: &TrackerState) {
        if let Err(err) = save_requests(&self.store, &state.records) {
            warn!(category = err.category(), "failed to persist reservations: {err}");
        }
        self.publish(state);
    }

    fn publish(&self, state: &TrackerState) {
        let next = state.status();
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
