//! Session lifecycle CLI commands

use anyhow::Result;
use colored::Colorize;

use crate::client::{
    ApiClient, ContainerOp, ContainerRequest, ResumeAppRequest, RunAppRequest, RunAppResponse,
};
use crate::output::{print_info, print_json, print_success, OutputFormat};

/// Launch a session
pub async fn run_app(client: &ApiClient, req: &RunAppRequest, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Table {
        print_info(&format!(
            "Launching {} for user {}...",
            req.app_release_uuid, req.user_id
        ));
    }

    let res: RunAppResponse = client.post("apps/run", req).await?;

    match format {
        OutputFormat::Json => print_json(&res)?,
        OutputFormat::Table => {
            print_success("Session started");
            println!("Container: {}", res.container.id.cyan());
            println!("Node:      {}", res.container.node_id);
            println!("Region:    {}", res.container.region);
        }
    }

    Ok(())
}

pub async fn pause_app(client: &ApiClient, container: ContainerOp) -> Result<()> {
    let id = container.id.clone();
    client
        .post_empty("apps/pause", &ContainerRequest { container })
        .await?;
    print_success(&format!("Container {} paused", id));
    Ok(())
}

/// Resume a paused session on a (possibly new) signalling connection
pub async fn resume_app(client: &ApiClient, req: &ResumeAppRequest) -> Result<()> {
    client.post_empty("apps/resume", req).await?;
    print_success(&format!("Container {} resumed", req.container.id));
    Ok(())
}

/// Stop a session; stopping an already stopped container also succeeds
pub async fn stop_app(client: &ApiClient, container: ContainerOp) -> Result<()> {
    let id = container.id.clone();
    client
        .post_empty("apps/stop", &ContainerRequest { container })
        .await?;
    print_success(&format!("Container {} stopped", id));
    Ok(())
}
