use std::time::Duration;

use anyhow::{Context, Result};
use buildboard_core::DashboardStatus;
use clap::Args;
use reqwest::StatusCode;
use tokio::time::sleep;

use crate::types::{RefreshResponse, error_message};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Block until the fetch finishes
    #[arg(long)]
    pub wait: bool,
}

pub async fn execute(agent_url: &str, args: &RefreshArgs) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{agent_url}/refresh");

    let response = client
        .post(&url)
        .send()
        .await
        .context("Failed to send request to agent")?;

    match response.status() {
        StatusCode::ACCEPTED => {
            let body: RefreshResponse =
                response.json().await.context("Failed to parse response")?;
            println!("Refresh {}.", body.status);
        }
        // Someone else's fetch is running; with --wait we just wait for it.
        StatusCode::CONFLICT if args.wait => {
            println!("A fetch is already in progress.");
        }
        _ => {
            anyhow::bail!("Failed to trigger refresh: {}", error_message(response).await);
        }
    }

    if args.wait {
        wait_for_completion(&client, agent_url).await?;
    }

    Ok(())
}

async fn wait_for_completion(client: &reqwest::Client, agent_url: &str) -> Result<()> {
    let url = format!("{agent_url}/status");

    loop {
        let response = client
            .get(&url)
            .send()
            .await
            .context("Failed to poll agent status")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch status: {}", error_message(response).await);
        }

        let status: DashboardStatus = response
            .json()
            .await
            .context("Failed to parse agent status")?;

        if status.is_loading {
            sleep(POLL_INTERVAL).await;
            continue;
        }

        if let Some(error) = status.last_error {
            anyhow::bail!("Fetch failed: {error}");
        }

        println!("Fetched {} builds.", status.build_count);
        if !status.partial_failures.is_empty() {
            println!(
                "Install links unavailable for: {}",
                status.partial_failures.join(", ")
            );
        }
        return Ok(());
    }
}
