#![allow(clippy::expect_used, clippy::unwrap_used, dead_code)]

use std::time::Duration;

use assert_cmd::Command;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CMD_TIMEOUT: Duration = Duration::from_secs(30);

/// Isolated data/config directories plus a mock provider.
pub struct TestEnv {
    pub server: MockServer,
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            data_dir: tempfile::tempdir().expect("data dir"),
            config_dir: tempfile::tempdir().expect("config dir"),
        }
    }

    /// Configured `smsrelay` command pointed at the mock provider.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("smsrelay").expect("smsrelay binary");
        cmd.timeout(CMD_TIMEOUT);
        cmd.env("SMSRELAY_PROVIDER_URL", format!("{}/api", self.server.uri()));
        cmd.env("SMSRELAY_TIMEOUT_SECS", "5");
        cmd.env("SMSRELAY_DATA_DIR", self.data_dir.path());
        cmd.env("SMSRELAY_CONFIG_DIR", self.config_dir.path());
        cmd.env("NO_COLOR", "1");
        for var in [
            "SMSRELAY_USER",
            "SMSRELAY_API_KEY",
            "SMSRELAY_OUTPUT_FORMAT",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Run a command expected to succeed and parse its JSON stdout.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .args(["--format", "json"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("stdout is JSON")
    }

    pub fn write_config(&self, toml: &str) {
        std::fs::write(self.config_dir.path().join("config.toml"), toml).unwrap();
    }

    pub async fn respond(&self, cmd: &str, message: Value) {
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("cmd", cmd))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "message": message,
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn respond_once(&self, cmd: &str, message: Value) {
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("cmd", cmd))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "message": message,
            })))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    pub async fn reject(&self, cmd: &str, message: &str) {
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("cmd", cmd))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "message": message,
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn forbid(&self, cmd: &str) {
        Mock::given(method("GET"))
            .and(query_param("cmd", cmd))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// Log in as `alice` with a remembered session.
    pub async fn login(&self) {
        self.respond("balance", json!("12.50")).await;
        self.cmd()
            .args(["login", "--user", "alice", "--api-key", "s3cret"])
            .assert()
            .success();
    }
}

pub fn reservation(id: u64, ttl: i64) -> Value {
    json!([{
        "id": id,
        "mdn": "13055550123",
        "service": "Google",
        "status": "Reserved",
        "state": "FL",
        "price": "0.75",
        "carrier": "Verizon",
        "till_expiration": ttl
    }])
}
