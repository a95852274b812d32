//! App service CLI
//!
//! A command-line tool for browsing the app catalog and driving cloud
//! gaming sessions through the app service API.

mod client;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{
    ContainerOp, ResumeAppRequest, RunAppRequest, SearchAppsAclRequest, SearchAppsRequest, WsConn,
};
use commands::{apps, sessions};

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// App service CLI
#[derive(Parser)]
#[command(name = "appctl")]
#[command(author, version, about = "CLI for the App Service catalog and session API", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via APPSVC_API_URL env var)
    #[arg(long, env = "APPSVC_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Container address shared by pause/resume/stop
#[derive(clap::Args)]
pub struct ContainerArgs {
    /// Container id
    pub container_id: String,

    /// Node the container runs on
    #[arg(long)]
    pub node_id: String,
}

impl From<ContainerArgs> for ContainerOp {
    fn from(args: ContainerArgs) -> Self {
        Self {
            id: args.container_id,
            node_id: args.node_id,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show an app release by uuid or numeric id
    Get {
        /// Release uuid or numeric id
        id: String,
    },

    /// Search the app catalog
    Search {
        /// Match against release, game and alternative names
        name: Option<String>,

        /// Filter by publisher name
        #[arg(long)]
        publisher: Option<String>,

        /// Hide releases rated Teen or above
        #[arg(long)]
        kids: bool,

        /// Sort order (name, ts_added, year_released)
        #[arg(long)]
        order_by: Option<String>,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Auto-complete release names
    Acl {
        /// Name prefix or fragment
        name: Option<String>,

        /// Hide releases rated Teen or above
        #[arg(long)]
        kids: bool,
    },

    /// Launch a session for a release
    Run {
        /// Release uuid or numeric id
        release: String,

        /// User id (falls back to the config file)
        #[arg(long)]
        user_id: Option<i64>,

        /// Signalling connection id
        #[arg(long)]
        ws_id: String,

        /// Signalling consumer id (falls back to the config file)
        #[arg(long)]
        consumer_id: Option<String>,

        /// Preferred data centers, best first; ranked server-side when omitted
        #[arg(long = "dc")]
        dcs: Vec<String>,
    },

    /// Pause a running session
    Pause(ContainerArgs),

    /// Resume a paused session
    Resume {
        #[command(flatten)]
        container: ContainerArgs,

        /// Signalling connection id
        #[arg(long)]
        ws_id: String,

        /// Signalling consumer id (falls back to the config file)
        #[arg(long)]
        consumer_id: Option<String>,
    },

    /// Stop a session
    Stop(ContainerArgs),

    /// Store defaults in the config file
    Config {
        #[arg(long)]
        api_url: Option<String>,

        #[arg(long)]
        user_id: Option<i64>,

        #[arg(long)]
        consumer_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut conf = config::Config::load()?;

    // Flag/env wins over the config file
    let api_url = cli
        .api_url
        .or_else(|| conf.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Get { id } => apps::get_app(&client, &id, cli.format).await?,
        Commands::Search {
            name,
            publisher,
            kids,
            order_by,
            offset,
            limit,
        } => {
            let req = SearchAppsRequest {
                app_name: name,
                publisher_name: publisher,
                kids_mode: kids,
                order_by,
                offset,
                limit,
            };
            apps::search_apps(&client, &req, cli.format).await?;
        }
        Commands::Acl { name, kids } => {
            let req = SearchAppsAclRequest {
                app_name: name,
                kids_mode: kids,
            };
            apps::search_acl(&client, &req, cli.format).await?;
        }
        Commands::Run {
            release,
            user_id,
            ws_id,
            consumer_id,
            dcs,
        } => {
            let req = RunAppRequest {
                app_release_uuid: release,
                user_id: user_id
                    .or(conf.user_id)
                    .context("--user-id is required (or set it with `appctl config`)")?,
                preferred_dcs: (!dcs.is_empty()).then_some(dcs),
                ws_conn: ws_conn(ws_id, consumer_id, &conf)?,
            };
            sessions::run_app(&client, &req, cli.format).await?;
        }
        Commands::Pause(container) => sessions::pause_app(&client, container.into()).await?,
        Commands::Resume {
            container,
            ws_id,
            consumer_id,
        } => {
            let req = ResumeAppRequest {
                container: container.into(),
                ws_conn: ws_conn(ws_id, consumer_id, &conf)?,
            };
            sessions::resume_app(&client, &req).await?;
        }
        Commands::Stop(container) => sessions::stop_app(&client, container.into()).await?,
        Commands::Config {
            api_url,
            user_id,
            consumer_id,
        } => {
            conf.api_url = api_url.or(conf.api_url);
            conf.user_id = user_id.or(conf.user_id);
            conf.consumer_id = consumer_id.or(conf.consumer_id);
            let path = config::Config::config_path()?;
            conf.save_to(&path)?;
            output::print_success(&format!("Saved {}", path.display()));
        }
    }

    Ok(())
}

fn ws_conn(id: String, consumer_id: Option<String>, conf: &config::Config) -> Result<WsConn> {
    let consumer_id = consumer_id
        .or_else(|| conf.consumer_id.clone())
        .context("--consumer-id is required (or set it with `appctl config`)")?;
    Ok(WsConn { id, consumer_id })
}
