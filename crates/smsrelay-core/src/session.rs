//! Account session: sign-in, remembered credentials and account-level queries.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::relay::{Command, CommandRelay, Credentials, RelayRequest};
use crate::store::{KeyValueStore, StoreKey};
use crate::types::ServiceInfo;
use crate::{Error, Result};

/// Balance shown when the provider omits it.
pub const DEFAULT_BALANCE: &str = "0.00";

/// A successful sign-in.
#[derive(Debug, Clone)]
pub struct SignedIn {
    /// Credentials to hand to the tracker.
    pub credentials: Credentials,
    /// Account balance reported while validating the credentials.
    pub balance: String,
}

/// Account-level operations that do not touch reservations.
pub struct Session<R, S> {
    relay: R,
    store: S,
}

impl<R: CommandRelay, S: KeyValueStore> Session<R, S> {
    /// Session over a relay and a store.
    pub const fn new(relay: R, store: S) -> Self {
        Self { relay, store }
    }

    /// Validate credentials with a balance lookup and apply remember-me.
    ///
    /// With `remember` the credentials are stored; without it any stored
    /// credentials are removed and the preference is recorded as off.
    pub async fn login(&self, user: &str, api_key: &str, remember: bool) -> Result<SignedIn> {
        let credentials = Credentials::new(user, api_key)?;
        let balance = self.balance(&credentials).await.map_err(|err| match err {
            Error::Provider(_) => Error::Provider("Username or API key is invalid.".into()),
            other => other,
        })?;

        if remember {
            self.store.set(StoreKey::Username, credentials.user())?;
            self.store.set(StoreKey::ApiKey, credentials.api_key())?;
            self.store.set(StoreKey::Remember, "true")?;
        } else {
            self.store.remove(StoreKey::Username)?;
            self.store.remove(StoreKey::ApiKey)?;
            self.store.set(StoreKey::Remember, "false")?;
        }

        info!(user = credentials.user(), remember, "logged in");
        Ok(SignedIn {
            credentials,
            balance,
        })
    }

    /// Silently sign in again with stored credentials.
    ///
    /// Returns `None` when nothing is stored or the provider refuses them.
    pub async fn restore(&self) -> Option<SignedIn> {
        let credentials = match self.stored_credentials() {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return None,
            Err(err) => {
                warn!("could not read stored credentials: {err}");
                return None;
            },
        };

        match self.balance(&credentials).await {
            Ok(balance) => {
                debug!(user = credentials.user(), "restored session");
                Some(SignedIn {
                    credentials,
                    balance,
                })
            },
            Err(err) => {
                debug!("stored credentials not accepted: {err}");
                None
            },
        }
    }

    /// Forget stored credentials and the remember-me preference.
    ///
    /// Tracked reservations are cleared separately by the tracker.
    pub fn logout(&self) -> Result<()> {
        for key in [StoreKey::Username, StoreKey::ApiKey, StoreKey::Remember] {
            self.store.remove(key)?;
        }
        info!("logged out");
        Ok(())
    }

    /// Credentials saved by a remembered login, if complete.
    pub fn stored_credentials(&self) -> Result<Option<Credentials>> {
        let user = self.store.get(StoreKey::Username)?;
        let api_key = self.store.get(StoreKey::ApiKey)?;
        match (user, api_key) {
            (Some(user), Some(api_key)) => Ok(Credentials::new(&user, &api_key).ok()),
            _ => Ok(None),
        }
    }

    /// Remember-me preference; on unless explicitly turned off.
    pub fn remember_preference(&self) -> Result<bool> {
        Ok(self.store.get(StoreKey::Remember)?.as_deref() != Some("false"))
    }

    /// Current account balance as a display string.
    pub async fn balance(&self, credentials: &Credentials) -> Result<String> {
        let payload = self
            .relay
            .execute(credentials, &RelayRequest::new(Command::Balance))
            .await?;
        Ok(match payload {
            Value::Null => DEFAULT_BALANCE.to_string(),
            Value::String(s) if s.is_empty() => DEFAULT_BALANCE.to_string(),
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    /// Service catalog, deduplicated by name (last entry wins) and sorted.
    pub async fn list_services(&self, credentials: &Credentials) -> Result<Vec<ServiceInfo>> {
        let payload = self
            .relay
            .execute(credentials, &RelayRequest::new(Command::ListServices))
            .await?;
        let Value::Array(items) = payload else {
            return Err(Error::UnexpectedResponse(format!(
                "service list is not an array: {payload}"
            )));
        };

        let unique: BTreeMap<String, ServiceInfo> = items
            .iter()
            .filter_map(ServiceInfo::from_value)
            .map(|svc| (svc.name.clone(), svc))
            .collect();
        debug!(count = unique.len(), "loaded service catalog");
        Ok(unique.into_values().collect())
    }

    /// Run any allow-listed command with caller-supplied parameters.
    pub async fn raw<I, K, V>(&self, credentials: &Credentials, command: &str, params: I) -> Result<Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let request = RelayRequest::from_raw(command, params)?;
        self.relay.execute(credentials, &request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::{ScriptedRelay, credentials};

    fn session() -> (
        Session<Arc<ScriptedRelay>, Arc<MemoryStore>>,
        Arc<ScriptedRelay>,
        Arc<MemoryStore>,
    ) {
        let relay = ScriptedRelay::new();
        let store = Arc::new(MemoryStore::new());
        (
            Session::new(Arc::clone(&relay), Arc::clone(&store)),
            relay,
            store,
        )
    }

    #[tokio::test]
    async fn remembered_login_is_stored_and_restored() {
        let (session, relay, store) = session();
        relay.push_ok(Command::Balance, json!("12.50"));

        let signed_in = session.login(" alice ", "s3cret", true).await.unwrap();
        assert_eq!(signed_in.balance, "12.50");
        assert_eq!(store.get(StoreKey::Username).unwrap().as_deref(), Some("alice"));
        assert_eq!(store.get(StoreKey::Remember).unwrap().as_deref(), Some("true"));

        relay.push_ok(Command::Balance, json!(3.5));
        let restored = session.restore().await.unwrap();
        assert_eq!(restored.credentials, credentials());
        assert_eq!(restored.balance, "3.5");
    }

    #[tokio::test]
    async fn login_without_remember_clears_stored_credentials() {
        let (session, relay, store) = session();
        store.set(StoreKey::Username, "old").unwrap();
        store.set(StoreKey::ApiKey, "old").unwrap();
        relay.push_ok(Command::Balance, Value::Null);

        let signed_in = session.login("alice", "s3cret", false).await.unwrap();
        assert_eq!(signed_in.balance, DEFAULT_BALANCE);
        assert!(store.get(StoreKey::Username).unwrap().is_none());
        assert!(!session.remember_preference().unwrap());
        assert!(session.restore().await.is_none());
    }

    #[tokio::test]
    async fn rejected_login_reports_invalid_credentials() {
        let (session, relay, store) = session();
        relay.push_error(Command::Balance, "Invalid API key");

        let err = session.login("alice", "wrong", true).await.unwrap_err();
        assert_eq!(err.to_string(), "Username or API key is invalid.");
        assert!(store.get(StoreKey::Username).unwrap().is_none());
    }

    #[tokio::test]
    async fn blank_credentials_skip_the_relay() {
        let (session, relay, _) = session();
        assert!(session.login("", "key", true).await.unwrap_err().is_validation());
        assert_eq!(relay.total_calls(), 0);
    }

    #[tokio::test]
    async fn restore_is_silent_on_rejection() {
        let (session, relay, store) = session();
        store.set(StoreKey::Username, "alice").unwrap();
        store.set(StoreKey::ApiKey, "revoked").unwrap();
        relay.push_error(Command::Balance, "Invalid API key");
        assert!(session.restore().await.is_none());
    }

    #[tokio::test]
    async fn logout_forgets_everything_session_related() {
        let (session, _, store) = session();
        store.set(StoreKey::Username, "alice").unwrap();
        store.set(StoreKey::ApiKey, "k").unwrap();
        store.set(StoreKey::Remember, "false").unwrap();

        session.logout().unwrap();
        for key in [StoreKey::Username, StoreKey::ApiKey, StoreKey::Remember] {
            assert!(store.get(key).unwrap().is_none());
        }
        assert!(session.remember_preference().unwrap());
    }

    #[tokio::test]
    async fn services_are_deduplicated_and_sorted() {
        let (session, relay, _) = session();
        relay.push_ok(
            Command::ListServices,
            json!([
                { "name": "Yahoo", "price": "0.40" },
                { "name": " Google ", "price": "0.50" },
                { "name": "" },
                { "name": "Google", "price": "0.55", "available": 12 }
            ]),
        );

        let services = session.list_services(&credentials()).await.unwrap();
        let names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Google", "Yahoo"]);
        assert_eq!(services[0].price.as_deref(), Some("0.55"));
        assert_eq!(services[0].available.as_deref(), Some("12"));
    }

    #[tokio::test]
    async fn raw_goes_through_the_allow_list() {
        let (session, relay, _) = session();
        relay.push_ok(Command::LtrStatus, json!({ "ltr_status": "online" }));

        let payload = session
            .raw(&credentials(), "ltr_status", [("mdn", "13055550123")])
            .await
            .unwrap();
        assert_eq!(payload["ltr_status"], "online");

        let err = session
            .raw(&credentials(), "delete_account", Vec::<(String, String)>::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedCommand(_)));
        assert_eq!(relay.total_calls(), 1);
    }
}
