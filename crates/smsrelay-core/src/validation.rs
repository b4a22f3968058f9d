//! Input validation performed before any relay call.
//!
//! A request may carry at most one location filter. Constructors on
//! [`LocationFilter`] are the only way to build a filtered value, so anything
//! reaching the relay has already passed these checks.

use crate::{Error, Result};

/// Two-letter codes accepted by the state filter.
pub const US_STATES: [&str; 50] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY",
];

/// Smallest area code the provider accepts.
pub const MIN_AREA_CODE: u16 = 201;
/// Largest area code the provider accepts.
pub const MAX_AREA_CODE: u16 = 999;

/// Optional constraint on which number the provider reserves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocationFilter {
    /// Any available number.
    #[default]
    None,
    /// Two-letter US state code.
    State(String),
    /// Three-digit area code in `201..=999`.
    AreaCode(String),
    /// A specific 11-digit number.
    Mdn(String),
}

impl LocationFilter {
    /// Validated state filter; the code is upper-cased.
    pub fn state(code: &str) -> Result<Self> {
        let code = code.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Err(Error::Validation("Please select a state.".into()));
        }
        if !US_STATES.contains(&code.as_str()) {
            return Err(Error::Validation(format!("Unknown state code '{code}'.")));
        }
        Ok(Self::State(code))
    }

    /// Validated area-code filter.
    pub fn area_code(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Validation(
                "Area code must be exactly 3 digits (201–999).".into(),
            ));
        }
        let value: u16 = code
            .parse()
            .map_err(|_| Error::Validation("Area code must be between 201 and 999.".into()))?;
        if !(MIN_AREA_CODE..=MAX_AREA_CODE).contains(&value) {
            return Err(Error::Validation(
                "Area code must be between 201 and 999.".into(),
            ));
        }
        Ok(Self::AreaCode(code.to_string()))
    }

    /// Validated 11-digit number filter.
    pub fn mdn(number: &str) -> Result<Self> {
        let number = number.trim();
        if number.len() != 11 || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Validation("MDN must be exactly 11 digits.".into()));
        }
        Ok(Self::Mdn(number.to_string()))
    }

    /// Build a filter from up to one optional raw value per kind.
    ///
    /// Supplying more than one kind is a validation error.
    pub fn from_parts(
        state: Option<&str>,
        area_code: Option<&str>,
        mdn: Option<&str>,
    ) -> Result<Self> {
        match (state, area_code, mdn) {
            (None, None, None) => Ok(Self::None),
            (Some(s), None, None) => Self::state(s),
            (None, Some(a), None) => Self::area_code(a),
            (None, None, Some(m)) => Self::mdn(m),
            _ => Err(Error::Validation(
                "Use at most one location filter: state, area code or MDN.".into(),
            )),
        }
    }

    /// Relay parameter carried by this filter, if any.
    #[must_use]
    pub fn as_param(&self) -> Option<(&'static str, &str)> {
        match self {
            Self::None => None,
            Self::State(code) => Some(("state", code)),
            Self::AreaCode(code) => Some(("areacode", code)),
            Self::Mdn(number) => Some(("mdn", number)),
        }
    }
}

/// Reject a blank service selection.
pub fn validate_service(service: &str) -> Result<&str> {
    let trimmed = service.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Please select a service.".into()));
    }
    Ok(trimmed)
}
