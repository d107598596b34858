use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;

mod archive;
mod auth;
mod bot;
mod cli;
mod config;
mod errors;
mod filename;
mod poster;
mod publish;
mod record;
mod storage;
mod tmdb;
mod translate;
mod transport;

use archive::{identifier, CatalogSource};
use auth::AccessGate;
use config::Config;
use record::ContentRecord;
use storage::BackendLocal;
use tmdb::MovieEnricher;
use transport::{BotApi, ChannelTransport};

const CATALOG_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();

    let base_path = args.dir.unwrap_or_else(config::default_base_path);
    let config = Config::load_with(&base_path)?;

    let http = reqwest::blocking::Client::builder()
        .timeout(CATALOG_HTTP_TIMEOUT)
        .build()
        .context("building catalog http client")?;
    let archive = archive::ArchiveClient::new(http.clone());
    let tmdb = tmdb::TmdbClient::new(http.clone(), &config.tmdb_api_key);

    match args.command {
        cli::Command::Daemon {} => {
            if config.bot_token.is_empty() {
                bail!("bot_token is not set; put it in config.yaml or the BOT_TOKEN env var");
            }

            let api = Arc::new(BotApi::new(&config.bot_token)?);
            let store = Arc::new(BackendLocal::new(config.base_path())?);
            let gate = Arc::new(AccessGate::new(config.admin_id, store));

            let stop = Arc::new(AtomicBool::new(false));
            ctrlc::set_handler({
                let stop = stop.clone();
                move || {
                    log::info!("shutdown requested");
                    stop.store(true, Ordering::Relaxed);
                }
            })
            .context("registering shutdown handler")?;

            let ctx = bot::BotContext {
                config: Arc::new(config),
                gate,
                archive: Arc::new(archive),
                tmdb: Arc::new(tmdb),
                transport: api.clone() as Arc<dyn ChannelTransport>,
                http,
            };

            bot::run(ctx, api, stop);
            Ok(())
        }

        cli::Command::Fetch { input, no_enrich } => {
            let item_id = identifier::extract(&input).unwrap_or(input);
            let doc = archive.metadata(&item_id)?;

            let enrich = match (&doc.title, no_enrich) {
                (Some(title), false) => {
                    let year = doc.date.as_deref().map(|d| d.chars().take(4).collect::<String>());
                    tmdb.search_movie(title, year.as_deref())?
                }
                _ => None,
            };

            let record =
                ContentRecord::merge(&doc, enrich.as_ref(), &identifier::details_url(&item_id));
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }

        cli::Command::Search { query } => {
            let hits = archive.search(&query)?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
            Ok(())
        }

        cli::Command::Parse { filename } => {
            match filename::parse(&filename) {
                Some(guess) => println!("{}", serde_json::to_string_pretty(&guess)?),
                None => println!("no title could be read from that filename"),
            }
            Ok(())
        }

        cli::Command::Authorize { user_id } => {
            let store = Arc::new(BackendLocal::new(config.base_path())?);
            let gate = AccessGate::new(config.admin_id, store);
            gate.authorize(user_id);
            println!("user {user_id} added to the allow list");
            Ok(())
        }
    }
}
