use anyhow::{Context, Result};
use buildboard_core::FilterSpec;
use clap::Args;

use crate::types::{FilterUpdate, error_message};

#[derive(Args, Debug)]
pub struct FilterSetArgs {
    /// Field to change: status, branch, app_title, buildNumber or sortBy
    pub field: String,
    /// New value; leave empty to clear the constraint
    #[arg(default_value = "")]
    pub value: String,
}

pub async fn show(agent_url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{agent_url}/filter");

    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to send request to agent")?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to fetch filter: {}", error_message(response).await);
    }

    let spec: FilterSpec = response.json().await.context("Failed to parse response")?;
    print_spec(&spec);
    Ok(())
}

pub async fn set(agent_url: &str, args: &FilterSetArgs) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{agent_url}/filter");

    let response = client
        .put(&url)
        .json(&FilterUpdate {
            field: &args.field,
            value: &args.value,
        })
        .send()
        .await
        .context("Failed to send request to agent")?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to update filter: {}", error_message(response).await);
    }

    let spec: FilterSpec = response.json().await.context("Failed to parse response")?;
    print_spec(&spec);
    Ok(())
}

pub async fn reset(agent_url: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{agent_url}/filter");

    let response = client
        .delete(&url)
        .send()
        .await
        .context("Failed to send request to agent")?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to reset filter: {}", error_message(response).await);
    }

    let spec: FilterSpec = response.json().await.context("Failed to parse response")?;
    print_spec(&spec);
    Ok(())
}

fn print_spec(spec: &FilterSpec) {
    let show = |value: &str| {
        if value.is_empty() {
            "(any)".to_string()
        } else {
            value.to_string()
        }
    };

    println!("Filter:");
    println!("  Status:       {}", show(&spec.status));
    println!("  Branch:       {}", show(&spec.branch));
    println!("  App title:    {}", show(&spec.app_title));
    println!("  Build number: {}", show(&spec.build_number));
    println!("  Sort by:      {}", spec.sort_by);
}
