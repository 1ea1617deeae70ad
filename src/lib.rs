pub mod cli;
pub mod coerce;
pub mod columns;
pub mod config;
pub mod data;
pub mod error;
pub mod io_utils;
pub mod mapping;
pub mod mapping_cmd;
pub mod preview;
pub mod rank;
pub mod resource;
pub mod schema;
pub mod summary;
pub mod table;
pub mod tvn;
pub mod tvn_cmd;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("galv_tvn", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Encode(args) => tvn_cmd::encode(&args),
        Commands::Decode(args) => tvn_cmd::decode(&args),
        Commands::Validate(args) => tvn_cmd::validate(&args),
        Commands::Coerce(args) => tvn_cmd::coerce(&args),
        Commands::Columns(args) => columns::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Rank(args) => mapping_cmd::rank(&args),
        Commands::Rename(args) => mapping_cmd::rename(&args),
    }
}
