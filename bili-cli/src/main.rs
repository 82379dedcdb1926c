mod cli;
mod config;

use std::process;

use anyhow::{Context, Result};
use bili_wbi::{
    BiliClient, SignatureParams,
    credentials::{Clock, SystemClock},
    mixin::derive_mixin_key,
    signer::{W_RID, sign},
};
use clap::Parser;
use serde::Serialize;
use tracing::{Level, debug, error, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{
    cli::{Args, Commands},
    config::AppConfig,
};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("Application error: {:#}", e);
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(max_retries) = args.max_retries {
        config.wbi.max_retries = max_retries;
    }
    debug!("Loaded config: {:?}", config);

    match args.command {
        Commands::Mixin { seed } => {
            if seed.chars().count() != 64 {
                warn!("seed is not 64 characters, the key will be wrong");
            }
            print_json(&serde_json::json!({ "mixin_key": derive_mixin_key(&seed) }))
        }
        Commands::Sign {
            img,
            sub,
            wts,
            params,
        } => {
            let wts = wts.unwrap_or_else(|| SystemClock.now().timestamp());
            let params = params
                .into_iter()
                .collect::<SignatureParams>()
                .with_timestamp(wts);
            let mixin_key = derive_mixin_key(&format!("{img}{sub}"));
            let w_rid = sign(&params, &mixin_key)?;
            print_json(&serde_json::json!({
                "mixin_key": mixin_key,
                "w_rid": w_rid,
                "query": format!("{}&{}={}", params.canonical_query(), W_RID, w_rid),
            }))
        }
        Commands::Keys => {
            let client = BiliClient::new(&config.wbi)?;
            let cache = client.session().cache();
            let keys = cache.wbi_keys().await.context("Failed to sync WBI keys")?;
            let cookie = cache
                .anonymous_cookie()
                .await
                .context("Failed to fetch anonymous cookie")?;
            print_json(&serde_json::json!({ "keys": keys, "cookie": cookie }))
        }
        Commands::WebId { mid } => {
            let client = BiliClient::new(&config.wbi)?;
            let web_id = client
                .session()
                .cache()
                .web_id(&mid)
                .await
                .with_context(|| format!("Failed to fetch web id of {mid}"))?;
            print_json(&web_id)
        }
        Commands::Works { mid, page } => {
            let client = BiliClient::new(&config.wbi)?;
            let works = client
                .artist_works(&mid, page)
                .await
                .with_context(|| format!("Failed to fetch works of {mid}"))?;
            print_json(&works)
        }
        Commands::Comments { aid } => {
            let client = BiliClient::new(&config.wbi)?;
            let comments = client
                .comments(&aid)
                .await
                .with_context(|| format!("Failed to fetch comments of {aid}"))?;
            print_json(&comments)
        }
        Commands::Search {
            keyword,
            page,
            kind,
        } => {
            let client = BiliClient::new(&config.wbi)?;
            let results = client
                .search(&keyword, page, kind.into())
                .await
                .context("Search failed")?;
            print_json(&results)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
