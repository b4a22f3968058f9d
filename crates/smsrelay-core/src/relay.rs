//! Allow-listed relay to the Tellabot command API.
//!
//! Every provider interaction goes through [`CommandRelay`]. The HTTP
//! implementation adds the account credentials and forwards parameters as a
//! query string; it never interprets payloads beyond the `status` envelope.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::{Error, Result};

/// Parameter names the relay sets itself; callers cannot override them.
const RESERVED_PARAMS: [&str; 3] = ["cmd", "user", "api_key"];

/// Provider commands accepted by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Command {
    Balance,
    ListServices,
    Request,
    RequestStatus,
    Reject,
    ReadSms,
    SendSms,
    LtrRent,
    LtrAutorenew,
    LtrStatus,
    LtrActivate,
    LtrRelease,
    LtrReport,
    LtrReportedStatus,
    LtrSwitchService,
    LtrForward,
    ProxyList,
    ProxyRent,
    ProxySwap,
    ProxyRedial,
}

impl Command {
    /// The full allow-list, in provider documentation order.
    pub const ALL: [Self; 20] = [
        Self::Balance,
        Self::ListServices,
        Self::Request,
        Self::RequestStatus,
        Self::Reject,
        Self::ReadSms,
        Self::SendSms,
        Self::LtrRent,
        Self::LtrAutorenew,
        Self::LtrStatus,
        Self::LtrActivate,
        Self::LtrRelease,
        Self::LtrReport,
        Self::LtrReportedStatus,
        Self::LtrSwitchService,
        Self::LtrForward,
        Self::ProxyList,
        Self::ProxyRent,
        Self::ProxySwap,
        Self::ProxyRedial,
    ];

    /// Wire name sent as the `cmd` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::ListServices => "list_services",
            Self::Request => "request",
            Self::RequestStatus => "request_status",
            Self::Reject => "reject",
            Self::ReadSms => "read_sms",
            Self::SendSms => "send_sms",
            Self::LtrRent => "ltr_rent",
            Self::LtrAutorenew => "ltr_autorenew",
            Self::LtrStatus => "ltr_status",
            Self::LtrActivate => "ltr_activate",
            Self::LtrRelease => "ltr_release",
            Self::LtrReport => "ltr_report",
            Self::LtrReportedStatus => "ltr_reported_status",
            Self::LtrSwitchService => "ltr_switch_service",
            Self::LtrForward => "ltr_forward",
            Self::ProxyList => "proxy_list",
            Self::ProxyRent => "proxy_rent",
            Self::ProxySwap => "proxy_swap",
            Self::ProxyRedial => "proxy_redial",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.as_str() == s)
            .ok_or_else(|| Error::UnsupportedCommand(s.to_string()))
    }
}

/// Account identifier and secret key, passed to the provider verbatim.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    api_key: String,
}

impl Credentials {
    /// Build credentials, rejecting blank values.
    pub fn new(user: &str, api_key: &str) -> Result<Self> {
        let user = user.trim();
        let api_key = api_key.trim();
        if user.is_empty() || api_key.is_empty() {
            return Err(Error::Validation(
                "Username and API key are required.".into(),
            ));
        }
        Ok(Self {
            user: user.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Account identifier.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Secret key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// A command plus its flat string parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    command: Command,
    params: BTreeMap<String, String>,
}

impl RelayRequest {
    /// Request without extra parameters.
    #[must_use]
    pub const fn new(command: Command) -> Self {
        Self {
            command,
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter. Reserved names are ignored.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        if RESERVED_PARAMS.contains(&key) {
            warn!("ignoring reserved relay parameter '{key}'");
            return self;
        }
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Parse a command name against the allow-list and attach raw parameters.
    ///
    /// Unknown commands fail before anything is sent.
    pub fn from_raw<I, K, V>(command: &str, params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let command = Command::from_str(command.trim())?;
        let mut request = Self::new(command);
        for (key, value) in params {
            let key = key.as_ref();
            if RESERVED_PARAMS.contains(&key) {
                return Err(Error::Validation(format!(
                    "Parameter '{key}' is set by the relay and cannot be overridden."
                )));
            }
            request = request.param(key, value);
        }
        Ok(request)
    }

    /// Command to run.
    #[must_use]
    pub const fn command(&self) -> Command {
        self.command
    }

    /// Parameter value by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parameters that will be forwarded; empty values are dropped.
    pub fn forwarded_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Pass-through channel to the provider's command API.
///
/// Implementations return the provider payload on `status: ok` and an
/// [`Error`] for everything else.
#[async_trait]
pub trait CommandRelay: Send + Sync {
    /// Run one command for the given account.
    async fn execute(&self, credentials: &Credentials, request: &RelayRequest) -> Result<Value>;
}

#[async_trait]
impl<T: CommandRelay + ?Sized> CommandRelay for std::sync::Arc<T> {
    async fn execute(&self, credentials: &Credentials, request: &RelayRequest) -> Result<Value> {
        (**self).execute(credentials, request).await
    }
}

/// Interpret a provider response body.
///
/// `{"status":"ok","message":X}` yields `X`; `{"status":"error","message":M}`
/// yields [`Error::Provider`]; anything else is a decode failure carrying the
/// raw body.
pub fn interpret_response(body: &str) -> Result<Value> {
    let json: Value = serde_json::from_str(body).map_err(|_| Error::Decode {
        message: "Invalid JSON response from Tellabot.".into(),
        raw: body.to_string(),
    })?;

    let status = json.get("status").and_then(Value::as_str);
    let message = json.get("message").cloned().unwrap_or(Value::Null);

    match status {
        Some("ok") => Ok(message),
        Some("error") => Err(Error::Provider(match message {
            Value::String(text) if !text.is_empty() => text,
            Value::Null => "Request failed.".to_string(),
            other => other.to_string(),
        })),
        _ => Err(Error::Decode {
            message: "Tellabot response is missing a status.".into(),
            raw: body.to_string(),
        }),
    }
}

/// HTTP relay calling the provider endpoint with query parameters.
pub struct HttpRelay {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpRelay {
    /// Creates a relay for the configured endpoint and timeout.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Self::with_timeout(&config.base_url, config.timeout())
    }

    /// Creates a relay with an explicit endpoint and request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("smsrelay/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            timeout,
        })
    }

    /// Endpoint this relay talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CommandRelay for HttpRelay {
    async fn execute(&self, credentials: &Credentials, request: &RelayRequest) -> Result<Value> {
        let mut query: Vec<(&str, &str)> = vec![
            ("cmd", request.command().as_str()),
            ("user", credentials.user()),
            ("api_key", credentials.api_key()),
        ];
        query.extend(request.forwarded_params());

        debug!(
            command = %request.command(),
            user = credentials.user(),
            params = request.params.len(),
            "relaying command"
        );

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        debug!(command = %request.command(), %status, bytes = body.len(), "relay response");

        interpret_response(&body)
    }
}

impl HttpRelay {
    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(format!(
                "Tellabot did not answer within {}s",
                self.timeout.as_secs_f32()
            ))
        } else {
            Error::Network(err)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn creds() -> Credentials {
        Credentials::new("alice", "s3cret").unwrap()
    }

    fn relay_for(server: &MockServer) -> HttpRelay {
        HttpRelay::with_timeout(&format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn allow_list_roundtrips() {
        for cmd in Command::ALL {
            assert_eq!(cmd.as_str().parse::<Command>().unwrap(), cmd);
        }
        assert!(matches!(
            "drop_tables".parse::<Command>(),
            Err(Error::UnsupportedCommand(name)) if name == "drop_tables"
        ));
    }

    #[test]
    fn credentials_are_required_and_redacted() {
        assert!(Credentials::new("", "key").unwrap_err().is_validation());
        assert!(Credentials::new("user", "  ").is_err());
        let debug = format!("{:?}", creds());
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn from_raw_rejects_unknown_and_reserved() {
        assert!(matches!(
            RelayRequest::from_raw("format_disk", Vec::<(String, String)>::new()),
            Err(Error::UnsupportedCommand(_))
        ));
        assert!(RelayRequest::from_raw("balance", [("api_key", "other")]).is_err());
        let req = RelayRequest::from_raw("ltr_status", [("mdn", "13055550123")]).unwrap();
        assert_eq!(req.command(), Command::LtrStatus);
        assert_eq!(req.get("mdn"), Some("13055550123"));
    }

    #[test]
    fn empty_params_are_not_forwarded() {
        let req = RelayRequest::new(Command::Request)
            .param("service", "Google")
            .param("state", "")
            .param("user", "mallory");
        let forwarded: Vec<_> = req.forwarded_params().collect();
        assert_eq!(forwarded, vec![("service", "Google")]);
    }

    #[test]
    fn interpret_ok_and_error() {
        assert_eq!(
            interpret_response(r#"{"status":"ok","message":"12.50"}"#).unwrap(),
            json!("12.50")
        );
        match interpret_response(r#"{"status":"error","message":"Invalid API key"}"#) {
            Err(Error::Provider(msg)) => assert_eq!(msg, "Invalid API key"),
            other => panic!("expected provider error, got {other:?}"),
        }
        match interpret_response("<html>502</html>") {
            Err(Error::Decode { raw, .. }) => assert_eq!(raw, "<html>502</html>"),
            other => panic!("expected decode error, got {other:?}"),
        }
        assert!(matches!(
            interpret_response(r#"{"message":"?"}"#),
            Err(Error::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn forwards_credentials_and_params() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("cmd", "request"))
            .and(query_param("user", "alice"))
            .and(query_param("api_key", "s3cret"))
            .and(query_param("service", "Google"))
            .and(query_param("areacode", "305"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "message": [{ "id": 1, "mdn": "13055550123", "till_expiration": 600 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let relay = relay_for(&server);
        let req = RelayRequest::new(Command::Request)
            .param("service", "Google")
            .param("areacode", "305");
        let payload = relay.execute(&creds(), &req).await?;
        assert_eq!(payload[0]["mdn"], "13055550123");
        Ok(())
    }

    #[tokio::test]
    async fn provider_error_is_surfaced() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "message": "No numbers available"
            })))
            .mount(&server)
            .await;

        let relay = relay_for(&server);
        let err = relay
            .execute(&creds(), &RelayRequest::new(Command::Request))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider(ref m) if m == "No numbers available"));
        Ok(())
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let relay = relay_for(&server);
        let err = relay
            .execute(&creds(), &RelayRequest::new(Command::Balance))
            .await
            .unwrap_err();
        match err {
            Error::Decode { message, raw } => {
                assert_eq!(message, "Invalid JSON response from Tellabot.");
                assert_eq!(raw, "Bad Gateway");
            },
            other => panic!("expected decode error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn slow_provider_times_out() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "ok", "message": "1.00" }))
                    .set_delay(Duration::from_millis(800)),
            )
            .mount(&server)
            .await;

        let relay =
            HttpRelay::with_timeout(&format!("{}/api", server.uri()), Duration::from_millis(150))?;
        let err = relay
            .execute(&creds(), &RelayRequest::new(Command::Balance))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "got {err:?}");
        assert!(err.is_recoverable());
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_network_error() -> anyhow::Result<()> {
        let relay = HttpRelay::with_timeout("http://127.0.0.1:9/api", Duration::from_secs(2))?;
        let err = relay
            .execute(&creds(), &RelayRequest::new(Command::Balance))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_) | Error::Timeout(_)));
        Ok(())
    }
}
