use anyhow::{Context, Result};
use buildboard_core::{EnrichedBuild, FilterOverrides, types::StatusTone};
use clap::Args;

use crate::types::error_message;

#[derive(Args, Debug)]
pub struct BuildListArgs {
    /// Only builds with this exact status (success, error, in-progress, ...)
    #[arg(long)]
    pub status: Option<String>,
    /// Only builds on this exact branch
    #[arg(long)]
    pub branch: Option<String>,
    /// Only builds whose artifact has this app title
    #[arg(long)]
    pub app_title: Option<String>,
    /// Only builds whose number contains this text
    #[arg(long)]
    pub build_number: Option<String>,
    /// Sort order: date (newest first), status, or anything else for fetch order
    #[arg(long)]
    pub sort_by: Option<String>,
}

impl BuildListArgs {
    fn overrides(&self) -> FilterOverrides {
        FilterOverrides {
            status: self.status.clone(),
            branch: self.branch.clone(),
            app_title: self.app_title.clone(),
            build_number: self.build_number.clone(),
            sort_by: self.sort_by.clone(),
        }
    }
}

pub async fn execute(agent_url: &str, args: &BuildListArgs) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{agent_url}/builds");

    let response = client
        .get(&url)
        .query(&args.overrides())
        .send()
        .await
        .context("Failed to send request to agent")?;

    if !response.status().is_success() {
        anyhow::bail!("Failed to list builds: {}", error_message(response).await);
    }

    let builds: Vec<EnrichedBuild> = response.json().await.context("Failed to parse response")?;

    if builds.is_empty() {
        println!("No builds found.");
        return Ok(());
    }

    println!(
        "{:<8} {:<2} {:<12} {:<20} {:<20} {:<20}",
        "NUMBER", "", "STATUS", "APP", "BRANCH", "TRIGGERED"
    );
    println!("{}", "-".repeat(87));
    for build in &builds {
        println!("{}", format_row(build));
    }

    Ok(())
}

pub fn format_row(build: &EnrichedBuild) -> String {
    format!(
        "{:<8} {:<2} {:<12} {:<20} {:<20} {:<20}",
        format!("#{}", build.build_number),
        tone_marker(build.status_text.tone()),
        build.status_text.as_str(),
        build.app_title.as_deref().unwrap_or("N/A"),
        build.branch.as_deref().unwrap_or("-"),
        format_triggered(build),
    )
}

pub fn format_triggered(build: &EnrichedBuild) -> String {
    match build.triggered_timestamp() {
        Some(at) => at.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => build.triggered_at.clone(),
    }
}

fn tone_marker(tone: StatusTone) -> &'static str {
    match tone {
        StatusTone::Passed => "+",
        StatusTone::Failed => "x",
        StatusTone::Pending => "~",
    }
}
