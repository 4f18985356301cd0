use anyhow::{Context, Result};
use buildboard_core::DashboardStatus;

use crate::types::error_message;

pub async fn execute(agent_url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{agent_url}/status");

    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to send request to agent")?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to fetch status: {}", error_message(response).await);
    }

    let status: DashboardStatus = response.json().await.context("Failed to parse response")?;

    println!("Agent Status:");
    println!(
        "  Loading:      {}",
        if status.is_loading { "yes" } else { "no" }
    );
    println!("  Builds:       {}", status.build_count);
    println!("  Visible:      {}", status.visible_count);
    match status.fetched_at {
        Some(at) => println!("  Last fetch:   {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("  Last fetch:   never"),
    }
    if let Some(error) = &status.last_error {
        println!("  Last error:   {error}");
    }
    if !status.partial_failures.is_empty() {
        println!(
            "  No install links for: {}",
            status.partial_failures.join(", ")
        );
    }

    Ok(())
}
