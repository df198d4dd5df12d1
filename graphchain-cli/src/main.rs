// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! graphchain command-line entry point

mod cli;

use clap::Parser;
use colored::Colorize;

use cli::{handle_run, handle_validate, handle_version, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.level_filter())
        .parse_default_env()
        .init();

    let result = match cli.command {
        Commands::Version => {
            handle_version();
            Ok(())
        }
        Commands::Validate { schema, chain } => handle_validate(schema, chain),
        Commands::Run {
            schema,
            chain,
            elements,
            store,
            user,
            auth,
            format,
        } => handle_run(schema, chain, elements, store, user, auth, format),
    };

    if let Err(e) = result {
        eprintln!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}
