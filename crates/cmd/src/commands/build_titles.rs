use anyhow::{Context, Result};

use crate::types::error_message;

pub async fn execute(agent_url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{agent_url}/app-titles");

    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to send request to agent")?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to list app titles: {}", error_message(response).await);
    }

    let titles: Vec<String> = response.json().await.context("Failed to parse response")?;
    if titles.is_empty() {
        println!("No app titles found.");
    }
    for title in titles {
        println!("{title}");
    }

    Ok(())
}
