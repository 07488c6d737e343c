use chrono::Local;
use clap::Parser;
use coos_digest::{COMMUNITY_URL, DigestConfig, Fetcher, LoadFromEnv, Notifier, extract};
use dotenv::dotenv;
use url::Url;

extern crate env_logger;
extern crate log;

use log::LevelFilter;

use log::{error, info};

/// Email a plain-text digest of today's COOS community posts.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Force the headless-browser fetcher, overriding USE_PLAYWRIGHT.
    #[arg(long)]
    render: bool,
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = DigestConfig::load_from_env()?;
    let rendered = args.render || config.rendered_fetch();

    let fetcher = Fetcher::from_mode(rendered)?;
    let html = fetcher.fetch(COMMUNITY_URL).await?;

    let base = Url::parse(COMMUNITY_URL)?;
    let today = Local::now().date_naive();
    let digest = extract(&html, &base, today);
    info!("found {} posts for today", digest.posts.len());

    let notifier = Notifier::new(&config)?;
    notifier.send(&digest).await?;
    info!("done");
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}
