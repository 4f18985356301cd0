use anyhow::{Context, Result};
use buildboard_core::EnrichedBuild;
use clap::Args;
use reqwest::StatusCode;

use crate::{commands::build_list::format_triggered, types::error_message};

#[derive(Args, Debug)]
pub struct BuildGetArgs {
    /// Build slug to fetch
    pub slug: String,
}

pub async fn execute(agent_url: &str, args: &BuildGetArgs) -> Result<()> {
    let client = reqwest::Client::new();
    let url = format!("{}/builds/{}", agent_url, args.slug);

    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to send request to agent")?;

    let status = response.status();

    if status.is_success() {
        let build: EnrichedBuild = response.json().await.context("Failed to parse response")?;
        print_build(&build);
    } else if status == StatusCode::NOT_FOUND {
        anyhow::bail!("Build not found: {}", args.slug);
    } else {
        anyhow::bail!("Failed to get build: {}", error_message(response).await);
    }

    Ok(())
}

fn print_build(build: &EnrichedBuild) {
    println!("Build #{}:", build.build_number);
    println!("  Slug:     {}", build.slug);
    println!(
        "  Status:   {} ({})",
        build.status_text,
        build.status_text.tone()
    );
    println!(
        "  App:      {}",
        build.app_title.as_deref().unwrap_or("N/A")
    );
    println!("  Branch:   {}", build.branch.as_deref().unwrap_or("-"));
    println!(
        "  Commit:   {}",
        build.commit_message.as_deref().unwrap_or("-")
    );
    println!("  Started:  {}", format_triggered(build));
    println!("  Build:    {}", build.build_url);
    if let Some(log_url) = &build.log_url {
        println!("  Logs:     {log_url}");
    }
    if let Some(url) = &build.public_install_page_url {
        println!("  Public download:  {url}");
    }
    if let Some(url) = &build.bitrise_download_page_url {
        println!("  Bitrise download: {url}");
    }
}
