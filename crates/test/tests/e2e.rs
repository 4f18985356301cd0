use std::{
    net::TcpListener,
    path::{Path, PathBuf},
    process::{Child, Command as StdCommand, Stdio},
    sync::OnceLock,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use assert_cmd::Command as CliCommand;
use buildboard_core::DashboardStatus;
use httpmock::prelude::*;
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use tokio::time::sleep;

const APP: &str = "e2e-app";
const TOKEN: &str = "e2e-token";
const WEB_BASE: &str = "https://web.example";

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn serves_enriched_builds() -> Result<()> {
    println!("Starting buildboard e2e test");

    let bitrise = MockServer::start_async().await;
    mock_bitrise(&bitrise).await;
    println!("Mock Bitrise API at {}", bitrise.base_url());

    let port = free_port()?;
    let config_dir = tempdir().context("create temp config dir")?;
    let config_path = write_config(&config_dir, &bitrise, port)?;

    let agent = spawn_agent(&config_path)?;
    let mut agent_guard = ChildGuard::new(agent);
    let agent_url = format!("http://127.0.0.1:{port}");

    println!("Waiting for first fetch at {agent_url}");
    let status = wait_for_fetch(&agent_url).await?;
    assert_eq!(status.build_count, 3);
    assert_eq!(status.partial_failures, ["b-3"]);

    verify_builds(&agent_url).await?;
    verify_cli(&agent_url)?;

    agent_guard.kill().ok();
    println!("E2E test complete");
    Ok(())
}

#[test]
fn agent_refuses_to_start_without_credentials() -> Result<()> {
    ensure_binaries_built()?;

    let assert = CliCommand::new(binary_path("buildboardd")?)
        .env_remove("BITRISE_API_TOKEN")
        .env_remove("BITRISE_APP_SLUG")
        .env_remove("BUILDBOARD_CONFIG")
        .timeout(Duration::from_secs(30))
        .assert()
        .failure();

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
    assert!(
        stderr.contains("BITRISE_API_TOKEN"),
        "unexpected stderr: {stderr}"
    );
    Ok(())
}

async fn mock_bitrise(server: &MockServer) {
    let builds = format!("/apps/{APP}/builds");

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path(builds.clone())
                .header("authorization", TOKEN);
            then.status(200).json_body(json!({
                "data": [
                    {
                        "slug": "b-1", "build_number": 101, "status_text": "success",
                        "branch": "main", "commit_message": "First",
                        "triggered_at": "2024-03-01T10:00:00Z"
                    },
                    {
                        "slug": "b-2", "build_number": 212, "status_text": "error",
                        "branch": "dev", "commit_message": "Second",
                        "triggered_at": "2024-03-03T10:00:00Z"
                    },
                    {
                        "slug": "b-3", "build_number": 150, "status_text": "success",
                        "branch": "main", "commit_message": "Third",
                        "triggered_at": "2024-03-02T10:00:00Z"
                    }
                ]
            }));
        })
        .await;

    for slug in ["b-1", "b-2", "b-3"] {
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("{builds}/{slug}/log"));
                then.status(200).json_body(json!({
                    "expiring_raw_log_url": format!("https://logs.example/{slug}")
                }));
            })
            .await;
    }

    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{builds}/b-1/artifacts"));
            then.status(200).json_body(json!({
                "data": [{ "slug": "art-1", "artifact_meta": { "app_info": {} } }]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{builds}/b-1/artifacts/art-1"));
            then.status(200).json_body(json!({
                "data": {
                    "public_install_page_url": "https://install.example/art-1",
                    "artifact_meta": { "app_info": { "app_title": "Demo App" } }
                }
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{builds}/b-3/artifacts"));
            then.status(500);
        })
        .await;
}

fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

fn write_config(dir: &TempDir, bitrise: &MockServer, port: u16) -> Result<PathBuf> {
    let path = dir.path().join("buildboard.yaml");
    let contents = format!(
        "api_token: {TOKEN}\napp_slug: {APP}\napi_base: {}\nweb_base: {WEB_BASE}\nmax_in_flight: 2\nport: {port}\n",
        bitrise.base_url()
    );
    std::fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

fn spawn_agent(config_path: &Path) -> Result<Child> {
    ensure_binaries_built()?;

    let binary = binary_path("buildboardd")?;
    println!("Launching agent binary at {}", binary.display());
    StdCommand::new(binary)
        .env("BUILDBOARD_CONFIG", config_path)
        .env("RUST_LOG", "warn")
        .env_remove("BITRISE_API_TOKEN")
        .env_remove("BITRISE_APP_SLUG")
        .env_remove("BUILDBOARD_API_BASE")
        .env_remove("BUILDBOARD_WEB_BASE")
        .env_remove("BUILDBOARD_PORT")
        .env_remove("BUILDBOARD_PAGE_LIMIT")
        .env_remove("BUILDBOARD_MAX_IN_FLIGHT")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("spawn buildboardd")
}

async fn wait_for_fetch(agent_url: &str) -> Result<DashboardStatus> {
    let client = reqwest::Client::new();
    let url = format!("{agent_url}/status");

    for _ in 0..60 {
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                let status: DashboardStatus = resp.json().await.context("decode status")?;
                if let Some(error) = &status.last_error {
                    bail!("agent fetch failed: {error}");
                }
                if !status.is_loading && status.fetched_at.is_some() {
                    return Ok(status);
                }
            }
        }
        sleep(Duration::from_millis(250)).await;
    }

    bail!("agent did not finish its first fetch at {url}")
}

async fn verify_builds(agent_url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let builds: Vec<Value> = client
        .get(format!("{agent_url}/builds"))
        .send()
        .await
        .context("request build list")?
        .error_for_status()
        .context("build list returned error")?
        .json()
        .await
        .context("decode build list")?;

    let numbers: Vec<u64> = builds
        .iter()
        .filter_map(|b| b["build_number"].as_u64())
        .collect();
    assert_eq!(numbers, [212, 150, 101], "newest first");

    let first = builds
        .iter()
        .find(|b| b["slug"] == "b-1")
        .context("b-1 missing")?;
    assert_eq!(first["app_title"], "Demo App");
    assert_eq!(first["log_url"], "https://logs.example/b-1");
    assert_eq!(first["build_url"], format!("{WEB_BASE}/build/b-1"));
    assert_eq!(
        first["bitrise_download_page_url"],
        format!("{WEB_BASE}/app/{APP}/installable-artifacts/art-1")
    );

    let degraded = builds
        .iter()
        .find(|b| b["slug"] == "b-3")
        .context("b-3 missing")?;
    assert_eq!(degraded["log_url"], "https://logs.example/b-3");
    assert!(degraded["app_title"].is_null());
    assert!(degraded["public_install_page_url"].is_null());

    Ok(())
}

fn verify_cli(agent_url: &str) -> Result<()> {
    let binary = binary_path("buildboard")?;

    let list = CliCommand::new(&binary)
        .args(["--agent-url", agent_url, "build", "list", "--status", "success"])
        .timeout(Duration::from_secs(30))
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&list.get_output().stdout).into_owned();
    assert!(stdout.contains("#101"), "stdout:\n{stdout}");
    assert!(stdout.contains("#150"), "stdout:\n{stdout}");
    assert!(!stdout.contains("#212"), "stdout:\n{stdout}");

    let titles = CliCommand::new(&binary)
        .args(["--agent-url", agent_url, "build", "titles"])
        .timeout(Duration::from_secs(30))
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&titles.get_output().stdout).into_owned();
    assert_eq!(stdout.trim(), "Demo App");

    let refresh = CliCommand::new(&binary)
        .args(["--agent-url", agent_url, "refresh", "--wait"])
        .timeout(Duration::from_secs(60))
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&refresh.get_output().stdout).into_owned();
    assert!(stdout.contains("Fetched 3 builds."), "stdout:\n{stdout}");

    CliCommand::new(&binary)
        .args(["--agent-url", agent_url, "build", "get", "missing"])
        .timeout(Duration::from_secs(30))
        .assert()
        .failure();

    Ok(())
}

fn workspace_root() -> Result<PathBuf> {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(Path::parent)
        .context("determine workspace root")
        .map(|p| p.to_path_buf())
}

fn binary_path(name: &str) -> Result<PathBuf> {
    let mut path = workspace_root()?;
    path.push("target");
    path.push("debug");
    let file = if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    };
    path.push(file);
    Ok(path)
}

fn ensure_binaries_built() -> Result<()> {
    static BUILT: OnceLock<Result<(), String>> = OnceLock::new();
    let res = BUILT.get_or_init(|| {
        let workspace_root = workspace_root().map_err(|e| e.to_string())?;
        let status = StdCommand::new(env!("CARGO"))
            .arg("build")
            .arg("-p")
            .arg("buildboard-agent")
            .arg("-p")
            .arg("buildboard")
            .current_dir(&workspace_root)
            .status()
            .map_err(|e| format!("build binaries for e2e test: {e}"))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!(
                "cargo build -p buildboard-agent -p buildboard failed with {status}"
            ))
        }
    });
    res.clone().map_err(|e| anyhow::anyhow!(e))
}

struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    fn kill(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        Ok(())
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let _ = self.kill();
    }
}
