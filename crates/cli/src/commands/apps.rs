//! Catalog CLI commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{
    AppReleaseDetails, ApiClient, SearchAppsAclRequest, SearchAppsAclResponse, SearchAppsRequest,
    SearchAppsResponse,
};
use crate::output::{
    format_esrb, format_screen, format_timestamp, or_dash, print_json, print_warning,
    render_table, OutputFormat,
};

/// Row for search results table
#[derive(Tabled)]
struct AppRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Slug")]
    slug: String,
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "Year")]
    year: String,
    #[tabled(rename = "Lang")]
    lang: String,
    #[tabled(rename = "ESRB")]
    esrb: String,
}

/// Show one release by uuid or numeric id
pub async fn get_app(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let release: AppReleaseDetails = client.get(&format!("apps/{}", id)).await?;

    if format == OutputFormat::Json {
        return print_json(&release);
    }

    println!("{}", release.name.bold());
    println!("{}", "=".repeat(60));
    println!("UUID:      {}", release.uuid.cyan());
    println!("ID:        {}", release.id);
    println!("Slug:      {}", release.igdb.slug);
    println!("Platform:  {}", release.platform.slug);
    println!("Year:      {}", or_dash(release.year_released));
    println!("Lang:      {}", or_dash(release.lang.as_deref()));
    println!(
        "Runner:    {} {}",
        release.runner.name,
        release.runner.ver.as_deref().unwrap_or("")
    );
    println!(
        "Screen:    {}",
        format_screen(
            release.app_reqs.screen_width,
            release.app_reqs.screen_height,
            release.app_reqs.color_bits
        )
    );
    println!("Added:     {}", format_timestamp(&release.ts_added));

    let publishers: Vec<&str> = release
        .companies
        .iter()
        .filter(|c| c.publisher)
        .filter_map(|c| c.name.as_deref())
        .collect();
    if !publishers.is_empty() {
        println!("Publisher: {}", publishers.join(", "));
    }
    if !release.tags.is_empty() {
        println!("Tags:      {}", release.tags.join(", "));
    }
    if let Some(descr) = &release.short_descr {
        println!("\n{}", descr);
    }

    Ok(())
}

/// Search the catalog
pub async fn search_apps(
    client: &ApiClient,
    req: &SearchAppsRequest,
    format: OutputFormat,
) -> Result<()> {
    let result: SearchAppsResponse = client.post("apps/search", req).await?;

    match format {
        OutputFormat::Json => print_json(&result.apps)?,
        OutputFormat::Table => {
            if result.apps.is_empty() {
                print_warning("No apps found");
                return Ok(());
            }

            let total = result.apps.len();
            let rows: Vec<AppRow> = result
                .apps
                .into_iter()
                .map(|a| AppRow {
                    id: a.id,
                    name: a.name,
                    slug: a.slug,
                    platform: a.platform,
                    year: or_dash(a.year_released),
                    lang: or_dash(a.lang),
                    esrb: format_esrb(a.esrb_rating),
                })
                .collect();

            println!("{}", render_table(rows));
            println!("\nTotal: {} apps", total);
        }
    }

    Ok(())
}

/// Auto-complete release names
pub async fn search_acl(
    client: &ApiClient,
    req: &SearchAppsAclRequest,
    format: OutputFormat,
) -> Result<()> {
    let result: SearchAppsAclResponse = client.post("apps/search/acl", req).await?;

    match format {
        OutputFormat::Json => print_json(&result.acl)?,
        OutputFormat::Table => {
            if result.acl.is_empty() {
                print_warning("No matches");
            }
            for name in &result.acl {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
