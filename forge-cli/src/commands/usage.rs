use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use crate::config::ConfigLoader;
use crate::context::open_gateway;

#[derive(Args, Debug)]
pub struct UsageArgs {
    /// Print as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: UsageArgs) -> Result<()> {
    let gateway = open_gateway(&ConfigLoader::load()?).await?;
    let usage = gateway.usage_stats().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&usage)?);
        return Ok(());
    }

    if usage.is_empty() {
        println!("No providers configured.");
        println!();
        println!("Add one with `forge auth set <provider>`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Provider").fg(Color::Cyan),
        Cell::new("Model").fg(Color::Cyan),
        Cell::new("Requests").fg(Color::Cyan),
        Cell::new("Last used").fg(Color::Cyan),
    ]);

    for (provider, stats) in &usage {
        table.add_row(vec![
            Cell::new(provider),
            Cell::new(&stats.model),
            Cell::new(stats.request_count),
            Cell::new(format_last_used(stats.last_used)),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn format_last_used(last_used: Option<DateTime<Utc>>) -> String {
    match last_used {
        Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => "never".to_string(),
    }
}
