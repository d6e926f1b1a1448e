use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pulse_feed::ListingView;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "pulse")]
#[command(version, about = "Browse pulse listing endpoints from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Page through a listing view the way the infinite-scroll UI does
    Browse(BrowseArgs),
    /// List the known views and the filters they accept
    Views,
}

#[derive(Args)]
struct BrowseArgs {
    /// Listing view (pulse-today, trend-analyzer, influencer-comment)
    #[arg(short, long)]
    view: ListingView,
    /// API base url, e.g. https://insights.example.com
    #[arg(long, required_unless_present = "demo")]
    base_url: Option<String>,
    /// Serve built-in sample data instead of calling an API
    #[arg(long, conflicts_with = "base_url")]
    demo: bool,
    /// Filter sent as-is (repeatable), e.g. --filter sectorId=12
    #[arg(short, long = "filter", value_parser = parse_key_value)]
    filters: Vec<(String, String)>,
    /// Filter whose value is a display name to slugify (repeatable)
    #[arg(long = "slug", value_parser = parse_key_value)]
    slugs: Vec<(String, String)>,
    /// Stop after this many pages
    #[arg(short, long, default_value_t = 3)]
    pages: u32,
    /// Feed settings (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing filter name in `{raw}`"));
    }
    Ok((name.to_owned(), value.trim().to_owned()))
}

fn init_tracing() {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => match tracing_subscriber::EnvFilter::try_new("error,pulse_feed=info") {
            Ok(filter) => filter,
            Err(_) => tracing_subscriber::EnvFilter::new("error"),
        },
    };

    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let Cli { command } = Cli::parse();

    match command {
        Commands::Browse(args) => {
            commands::browse::execute(commands::browse::BrowseOptions {
                view: args.view,
                base_url: args.base_url,
                demo: args.demo,
                filters: args.filters,
                slugs: args.slugs,
                pages: args.pages,
                config: args.config,
            })
            .await?;
        }
        Commands::Views => commands::views::execute(),
    }

    Ok(())
}
