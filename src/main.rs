use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod corpus;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;
mod web;
use config::Config;
use corpus::Corpus;
use semantic::{RankOptions, SemanticSearchService};

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_corpus(config: &Config) -> anyhow::Result<Corpus> {
    Ok(match config.corpus_path() {
        Some(path) => Corpus::load(&path)?,
        None => Corpus::builtin(),
    })
}

fn build_service(config: &Config) -> anyhow::Result<SemanticSearchService> {
    let corpus = load_corpus(config)?;
    let provider = semantic::provider_from_config(config)?;
    let sem = &config.semantic_search;

    Ok(SemanticSearchService::new(provider, corpus, sem.rank_options())
        .with_timeout(sem.request_timeout()))
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging(args.verbose);

    let config = Config::load()?;

    match args.command {
        cli::Command::Daemon { addr } => {
            let addr = addr.unwrap_or_else(|| config.listen_addr.clone());
            let service = Arc::new(build_service(&config)?);
            web::start_daemon(service, &addr)
        }

        cli::Command::Search {
            query,
            threshold,
            limit,
        } => {
            let service = build_service(&config)?;
            let defaults = service.options();
            let options = RankOptions {
                threshold: threshold.unwrap_or(defaults.threshold),
                limit: limit.unwrap_or(defaults.limit),
            };

            let response = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(service.search(&query, Some(options)))?;

            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }

        cli::Command::Corpus {} => {
            let corpus = load_corpus(&config)?;
            println!("{}", serde_json::to_string_pretty(corpus.items())?);
            Ok(())
        }
    }
}
