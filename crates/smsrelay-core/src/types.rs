//! Reservation records and provider payload decoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Marker stored when an SMS arrives without reply text or PIN.
pub const SMS_RECEIVED_FALLBACK: &str = "SMS received.";

/// Note stored on a record after a successful cancel.
pub const CANCELLED_NOTE: &str = "Number cancelled.";

/// Longest time-to-live accepted from the provider, one year.
pub const MAX_TILL_EXPIRATION_SECS: i64 = 366 * 86_400;

/// Lifecycle state of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Reservation active, awaiting an SMS.
    Waiting,
    /// An SMS was received.
    Message,
    /// Countdown reached zero or the number was cancelled. Terminal.
    Expired,
}

impl Mode {
    /// Lowercase name as stored and displayed.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Message => "message",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider-issued virtual number held for a bounded time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberRequest {
    /// Provider-assigned reservation id.
    pub id: u64,
    /// The rented number (MDN).
    pub phone_number: String,
    /// Service the number was rented for.
    pub service_name: String,
    /// Provider status text, e.g. `Reserved`.
    pub status: String,
    /// State the number belongs to, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Markup percentage applied by the provider.
    pub markup: f64,
    /// Price charged for the reservation.
    pub price: f64,
    /// Carrier name, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    /// Time-to-live reported when the number was reserved.
    pub seconds_until_expiration: i64,
    /// Creation time, milliseconds since the epoch.
    pub created_at: i64,
    /// Absolute expiry, milliseconds since the epoch.
    pub expires_at: i64,
    /// Derived from `expires_at`; never persisted.
    #[serde(skip)]
    pub remaining_seconds: u64,
    /// Lifecycle state.
    pub mode: Mode,
    /// Decoded message, or a note such as [`CANCELLED_NOTE`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms_text: Option<String>,
}

impl NumberRequest {
    /// Build a fresh record from a reservation payload observed at `now_millis`.
    ///
    /// A non-positive time-to-live produces a record that is already expired.
    #[must_use]
    pub fn from_reservation(reservation: Reservation, now_millis: i64) -> Self {
        let ttl = reservation.till_expiration.max(0);
        let mode = if ttl > 0 { Mode::Waiting } else { Mode::Expired };

        Self {
            id: reservation.id,
            phone_number: reservation.mdn,
            service_name: reservation.service,
            status: reservation.status,
            region: reservation.state,
            markup: reservation.markup,
            price: reservation.price,
            carrier: reservation.carrier,
            seconds_until_expiration: ttl,
            created_at: now_millis,
            expires_at: now_millis.saturating_add(ttl.saturating_mul(1000)),
            remaining_seconds: ttl.unsigned_abs(),
            mode,
            sms_text: None,
        }
    }

    /// Recompute the countdown from `expires_at`, downgrading a stale `waiting` record.
    ///
    /// Records in `message` or `expired` keep their mode. An `expired` record
    /// always shows zero, including one cancelled before its deadline.
    #[must_use]
    pub fn restored(mut self, now_millis: i64) -> Self {
        self.remaining_seconds = match self.mode {
            Mode::Expired => 0,
            Mode::Waiting | Mode::Message => remaining_seconds_at(self.expires_at, now_millis),
        };
        if self.mode == Mode::Waiting && self.remaining_seconds == 0 {
            self.mode = Mode::Expired;
        }
        self
    }

    /// `true` while the reservation is active and awaiting an SMS.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.mode == Mode::Waiting
    }
}

/// Whole seconds left until `expires_at`, clamped at zero.
#[must_use]
pub fn remaining_seconds_at(expires_at: i64, now_millis: i64) -> u64 {
    let diff = expires_at.saturating_sub(now_millis);
    if diff <= 0 {
        0
    } else {
        diff.unsigned_abs() / 1000
    }
}

/// One reservation entry of a `request` response, with lenient field coercion.
///
/// The provider sends numbers both as JSON numbers and as strings. Field
/// names follow the payload.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct Reservation {
    pub id: u64,
    pub mdn: String,
    pub service: String,
    pub status: String,
    pub state: Option<String>,
    pub markup: f64,
    pub price: f64,
    pub carrier: Option<String>,
    pub till_expiration: i64,
}

impl Reservation {
    /// Decode the first entry of a `request` payload.
    ///
    /// `fallback` supplies values for fields the provider omitted; it is the
    /// source record when reactivating. `default_service` is used when neither
    /// the payload nor the fallback name a service.
    pub fn from_payload(
        payload: &Value,
        default_service: &str,
        fallback: Option<&NumberRequest>,
    ) -> Result<Self> {
        let item = first_entry(payload).ok_or_else(|| {
            Error::UnexpectedResponse(format!("Request succeeded but returned no numbers: {payload}"))
        })?;

        let id = number_field(item, "id")
            .filter(|id| id.is_finite() && *id >= 0.0 && id.fract() == 0.0)
            .map(|id| id as u64)
            .ok_or_else(|| Error::UnexpectedResponse(format!("Reservation without a valid id: {item}")))?;

        let mdn = string_field(item, "mdn")
            .or_else(|| fallback.map(|f| f.phone_number.clone()))
            .unwrap_or_default();
        let service = string_field(item, "service")
            .or_else(|| fallback.map(|f| f.service_name.clone()))
            .unwrap_or_else(|| default_service.to_string());

        let finite_or = |key: &str, default: f64| {
            number_field(item, key)
                .filter(|v| v.is_finite())
                .unwrap_or(default)
        };

        Ok(Self {
            id,
            mdn,
            service,
            status: string_field(item, "status").unwrap_or_else(|| "Reserved".to_string()),
            state: string_field(item, "state").or_else(|| fallback.and_then(|f| f.region.clone())),
            markup: finite_or("markup", fallback.map_or(0.0, |f| f.markup)),
            price: finite_or("price", fallback.map_or(0.0, |f| f.price)),
            carrier: string_field(item, "carrier").or_else(|| fallback.and_then(|f| f.carrier.clone())),
            till_expiration: till_expiration(item)?,
        })
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn till_expiration(item: &Value) -> Result<i64> {
    let Some(ttl) = number_field(item, "till_expiration").filter(|v| v.is_finite()) else {
        return Ok(0);
    };
    if ttl > MAX_TILL_EXPIRATION_SECS as f64 {
        return Err(Error::UnexpectedResponse(format!(
            "Reservation time-to-live out of range: {ttl}"
        )));
    }
    Ok(ttl.trunc().max(0.0) as i64)
}

/// Decode the first message of a `read_sms` payload into display text.
///
/// Returns `None` when the payload holds no messages.
#[must_use]
pub fn decode_sms(payload: &Value) -> Option<String> {
    let msg = first_entry(payload)?;
    let reply = string_field(msg, "reply").unwrap_or_default();
    let pin = pin_field(msg).unwrap_or_default();

    let text = if !pin.is_empty() && !reply.is_empty() && reply.contains(&pin) {
        format!("{reply} (PIN: {pin})")
    } else if !reply.is_empty() {
        reply
    } else if !pin.is_empty() {
        pin
    } else {
        SMS_RECEIVED_FALLBACK.to_string()
    };
    Some(text)
}

/// Service entry from the provider catalog. Prices are kept as display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ServiceInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ltr_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ltr_short_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ltr_available: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_markup: Option<String>,
}

impl ServiceInfo {
    /// Decode one catalog entry; entries with a blank name are dropped.
    #[must_use]
    pub fn from_value(item: &Value) -> Option<Self> {
        let name = string_field(item, "name")?.trim().to_string();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            price: string_field(item, "price"),
            ltr_price: string_field(item, "ltr_price"),
            ltr_short_price: string_field(item, "ltr_short_price"),
            available: string_field(item, "available"),
            ltr_available: string_field(item, "ltr_available"),
            recommended_markup: string_field(item, "recommended_markup"),
        })
    }
}

fn first_entry(payload: &Value) -> Option<&Value> {
    payload.as_array().and_then(|items| items.first())
}

/// Non-empty string form of a scalar field.
pub(crate) fn string_field(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// PIN as text. A numeric zero or `false` means no PIN was extracted.
fn pin_field(msg: &Value) -> Option<String> {
    match msg.get("pin")? {
        Value::Number(n) if n.as_f64().is_some_and(|v| v.abs() < f64::EPSILON) => None,
        Value::Bool(false) => None,
        _ => string_field(msg, "pin"),
    }
}

fn number_field(item: &Value, key: &str) -> Option<f64> {
    match item.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
