//! Integration tests for the `check`, `validate`, and `init` commands driven through `run`.

use camino::Utf8PathBuf;
use gh_rate_monitor::Host;
use std::io::Cursor;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRIVATE_KEY_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/app-key.pem");

/// Test host that captures output to in-memory buffers.
struct TestHost {
    output_buf: Vec<u8>,
    error_buf: Vec<u8>,
    exit_code: Option<i32>,
}

impl TestHost {
    const fn new() -> Self {
        Self {
            output_buf: Vec::new(),
            error_buf: Vec::new(),
            exit_code: None,
        }
    }

    fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output_buf).into_owned()
    }

    fn error_str(&self) -> String {
        String::from_utf8_lossy(&self.error_buf).into_owned()
    }
}

impl Host for TestHost {
    fn output(&mut self) -> impl std::io::Write {
        let end = self.output_buf.len() as u64;
        let mut cursor = Cursor::new(&mut self.output_buf);
        cursor.set_position(end);
        cursor
    }

    fn error(&mut self) -> impl std::io::Write {
        let end = self.error_buf.len() as u64;
        let mut cursor = Cursor::new(&mut self.error_buf);
        cursor.set_position(end);
        cursor
    }

    fn exit(&mut self, code: i32) {
        self.exit_code = Some(code);
    }
}

async fn mock_github() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/app/installations/987654/access_tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "token": "ghs_installation",
            "expires_at": (chrono::Utc::now() + chrono::TimeDelta::hours(1)).to_rfc3339(),
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .and(header("authorization", "Bearer ghs_installation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "resources": {
                "core": { "limit": 5000, "used": 1, "remaining": 4999, "reset": 1_900_000_000 },
                "graphql": { "limit": 5000, "used": 0, "remaining": 5000, "reset": 1_900_000_000 }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .and(header("authorization", "Bearer ghp_personal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "resources": {
                "core": { "limit": 5000, "used": 4500, "remaining": 500, "reset": 1_900_000_000 }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .and(header("authorization", "Bearer ghp_revoked"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({ "message": "Bad credentials" })))
        .mount(&server)
        .await;

    server
}

fn write_config(dir: &tempfile::TempDir, server: &MockServer, ops_token: &str) -> Utf8PathBuf {
    let text = format!(
        r#"
api_url = "{}"
request_timeout = "5s"

[[apps]]
name = "ci-bot"
auth = "github_app"
app_id = 123456
installation_id = 987654
private_key_path = "{PRIVATE_KEY_PATH}"

[[apps]]
name = "ops"
auth = "personal_token"
token = "{ops_token}"
"#,
        server.uri()
    );

    let path = Utf8PathBuf::try_from(dir.path().join("gh-rate-monitor.toml")).unwrap();
    std::fs::write(&path, text).unwrap();
    path
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn test_check_prints_console_report() {
    let server = mock_github().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(&tmp, &server, "ghp_personal");

    let mut host = TestHost::new();
    gh_rate_monitor::run(&mut host, ["gh-rate-monitor", "check", "--config", config.as_str(), "--color", "never"])
        .await
        .unwrap();

    let output = host.output_str();
    assert!(output.contains("ci-bot"), "{output}");
    assert!(output.contains("ops"), "{output}");
    assert!(output.contains("HEALTHY"), "{output}");
    assert!(output.contains("CRITICAL"), "{output}");
    assert!(!output.contains("ghp_personal"));
    assert_eq!(host.exit_code, None);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn test_check_prints_json_report() {
    let server = mock_github().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(&tmp, &server, "ghp_personal");

    let mut host = TestHost::new();
    gh_rate_monitor::run(&mut host, ["gh-rate-monitor", "check", "--config", config.as_str(), "--json"])
        .await
        .unwrap();

    let report: serde_json::Value = serde_json::from_str(&host.output_str()).unwrap();
    let apps = report["apps"].as_array().unwrap();
    assert_eq!(apps.len(), 2);
    assert_eq!(apps[0]["name"], "ci-bot");
    assert_eq!(apps[0]["status"], "ok");
    assert_eq!(apps[0]["app_id"], 123_456);
    assert_eq!(apps[1]["name"], "ops");
    assert_eq!(apps[1]["resources"][0]["remaining"], 500);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn test_check_exits_non_zero_when_an_app_fails() {
    let server = mock_github().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(&tmp, &server, "ghp_revoked");

    let mut host = TestHost::new();
    gh_rate_monitor::run(&mut host, ["gh-rate-monitor", "check", "--config", config.as_str(), "--color", "never"])
        .await
        .unwrap();

    assert_eq!(host.exit_code, Some(1));
    assert!(host.output_str().contains("Bad credentials"));
    assert!(host.error_str().contains("1 of 2 app(s) could not be checked"));
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn test_validate_then_init() {
    let server = mock_github().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(&tmp, &server, "ghp_personal");

    let mut host = TestHost::new();
    gh_rate_monitor::run(&mut host, ["gh-rate-monitor", "validate", "--config", config.as_str()])
        .await
        .unwrap();
    assert!(host.output_str().contains("ci-bot: github_app"));
    assert!(host.output_str().contains("ops: personal_token"));

    // The config file exists, so init must leave it alone unless forced.
    let mut host = TestHost::new();
    let _ = gh_rate_monitor::run(&mut host, ["gh-rate-monitor", "init", config.as_str()])
        .await
        .unwrap_err();
    assert!(std::fs::read_to_string(&config).unwrap().contains("ci-bot"));

    gh_rate_monitor::run(&mut host, ["gh-rate-monitor", "init", config.as_str(), "--force"])
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(&config).unwrap(), gh_rate_monitor::config::DEFAULT_CONFIG_TOML);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri cannot call CreateIoCompletionPort")]
async fn test_check_with_token_flag_and_no_apps() {
    let server = mock_github().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = Utf8PathBuf::try_from(tmp.path().join("gh-rate-monitor.toml")).unwrap();
    std::fs::write(&config, format!("api_url = \"{}\"\n", server.uri())).unwrap();

    let mut host = TestHost::new();
    gh_rate_monitor::run(
        &mut host,
        ["gh-rate-monitor", "check", "--config", config.as_str(), "--json", "--token", "ghp_personal"],
    )
    .await
    .unwrap();

    let report: serde_json::Value = serde_json::from_str(&host.output_str()).unwrap();
    let apps = report["apps"].as_array().unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0]["name"], "default");
    assert_eq!(apps[0]["status"], "ok");
    assert_eq!(apps[0]["resources"][0]["remaining"], 500);
    assert_eq!(host.exit_code, None);
}
