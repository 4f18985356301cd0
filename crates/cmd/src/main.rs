mod commands;
mod types;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{build_get, build_list, build_titles, filter, refresh, status};

const DEFAULT_AGENT_URL: &str = "http://localhost:7080";

#[derive(Parser)]
#[command(name = "buildboard")]
#[command(about = "Browse CI builds collected by buildboardd")]
struct Cli {
    /// Agent API URL
    #[arg(long, default_value = DEFAULT_AGENT_URL)]
    agent_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect builds
    Build {
        #[command(subcommand)]
        command: BuildCommands,
    },
    /// Ask the agent to fetch builds again
    Refresh(refresh::RefreshArgs),
    /// Show the agent's fetch status
    Status,
    /// Show or change the agent's stored filter
    Filter {
        #[command(subcommand)]
        command: FilterCommands,
    },
}

#[derive(Subcommand)]
enum BuildCommands {
    /// List builds
    List(build_list::BuildListArgs),
    /// Get details about a specific build
    Get(build_get::BuildGetArgs),
    /// List the distinct app titles
    Titles,
}

#[derive(Subcommand)]
enum FilterCommands {
    /// Print the stored filter
    Show,
    /// Change one field of the stored filter
    Set(filter::FilterSetArgs),
    /// Clear every constraint and sort newest first
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let agent_url = cli.agent_url.trim_end_matches('/');

    match &cli.command {
        Commands::Build { command } => match command {
            BuildCommands::List(args) => {
                build_list::execute(agent_url, args).await?;
            }
            BuildCommands::Get(args) => {
                build_get::execute(agent_url, args).await?;
            }
            BuildCommands::Titles => {
                build_titles::execute(agent_url).await?;
            }
        },
        Commands::Refresh(args) => {
            refresh::execute(agent_url, args).await?;
        }
        Commands::Status => {
            status::execute(agent_url).await?;
        }
        Commands::Filter { command } => match command {
            FilterCommands::Show => {
                filter::show(agent_url).await?;
            }
            FilterCommands::Set(args) => {
                filter::set(agent_url, args).await?;
            }
            FilterCommands::Reset => {
                filter::reset(agent_url).await?;
            }
        },
    }

    Ok(())
}
