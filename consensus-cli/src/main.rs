//! # Truthcoin Consensus CLI
//!
//! This crate provides a CLI interface to use the `truthcoin-consensus` library.

#![warn(trivial_casts)]
#![deny(
	absolute_paths_not_starting_with_crate, deprecated, future_incompatible, missing_docs,
	nonstandard_style, unreachable_code, unreachable_patterns
)]
#![forbid(unsafe_code)]
#![deny(
	// Complexity
 	clippy::unnecessary_cast,
	clippy::needless_question_mark,
	// Pedantic
 	clippy::cast_lossless,
 	clippy::cast_possible_wrap,
	// Perf
	clippy::redundant_clone,
	// Restriction
 	clippy::panic,
	// Style
 	clippy::let_and_return,
 	clippy::needless_borrow
)]

mod cli;
mod fs;

use clap::Parser;
use cli::*;
use dotenv::dotenv;
use env_logger::{init_from_env, Env};
use fs::load_config;
use log::info;
use truthcoin_consensus::{error::ConsensusError, ConsensusConfig};

fn main() -> Result<(), ConsensusError> {
	dotenv().ok();
	let cli = Cli::parse();

	let default_level = if cli.verbose { "debug" } else { "info" };
	init_from_env(Env::default().filter_or("LOG_LEVEL", default_level));
	let mut config: ConsensusConfig = load_config()?;

	match cli.mode {
		Mode::Evolve(evolve_data) => handle_evolve(config, evolve_data, cli.verbose)?,
		Mode::Resolve(round_data) => handle_resolve(config, round_data, cli.verbose)?,
		Mode::Show => info!("Consensus config:\n{:#?}", config),
		Mode::Update(update_data) => handle_update(&mut config, update_data)?,
	};

	Ok(())
}
