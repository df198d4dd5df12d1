// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command handlers for graphchain

use colored::Colorize;
use log::info;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::commands::OutputFormat;
use super::output::ResultFormatter;
use graphchain::plan::AddElements;
use graphchain::{
    ConfigError, Context, Element, Graph, GraphConfig, GraphError, OperationChain, Schema, SchemaError,
    StoreProperties, User,
};

/// Errors reported by CLI commands
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Handle the validate command
pub fn handle_validate(schema: Vec<PathBuf>, chain: Option<PathBuf>) -> Result<(), CliError> {
    let graph = build_graph(&schema, StoreProperties::default())?;
    let graph_schema = graph.schema();
    println!("{}", "Schema is valid".bold().green());
    println!(
        "  → {} entity group(s): {}",
        graph_schema.entity_groups().count(),
        graph_schema.entity_groups().collect::<Vec<_>>().join(", ").cyan()
    );
    println!(
        "  → {} edge group(s): {}",
        graph_schema.edge_groups().count(),
        graph_schema.edge_groups().collect::<Vec<_>>().join(", ").cyan()
    );

    if let Some(path) = chain {
        let chain = OperationChain::from_json_file(&path)?;
        println!("{}", format!("Chain {} is valid", path.display()).bold().green());
        for (position, operation) in chain.operations().iter().enumerate() {
            println!("  {}. {}", position, operation.name().cyan());
        }
        println!("  Output: {}", chain.output_kind().to_string().yellow());
    }
    Ok(())
}

/// Handle the run command
#[allow(clippy::too_many_arguments)]
pub fn handle_run(
    schema: Vec<PathBuf>,
    chain: PathBuf,
    elements: Option<PathBuf>,
    store: Option<PathBuf>,
    user: String,
    auths: Vec<String>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let properties = match store {
        Some(path) => StoreProperties::from_json_file(path)?,
        None => StoreProperties::default(),
    };
    let graph = build_graph(&schema, properties)?;
    let user = User::with_auths(user, auths);

    if let Some(path) = elements {
        let loaded = load_elements(&path)?;
        let count = loaded.len();
        let add = OperationChain::of(AddElements::new().input(loaded))?;
        graph.execute(&add, &user)?;
        info!("Loaded {} element(s) from {}", count, path.display());
    }

    let chain = OperationChain::from_json_file(&chain)?;
    let ctx = Context::new(user);
    let output = graph.execute_with(&chain, &ctx)?;
    if output.is_void() {
        println!("{}", "Chain completed with no output".green());
    } else {
        let items = output.into_items()?;
        let formatted = ResultFormatter::format(&items, format).map_err(|source| CliError::Json {
            path: "results".to_string(),
            source,
        })?;
        println!("{}", formatted);
    }

    for failure in ctx.take_failures() {
        eprintln!(
            "{}",
            format!(
                "ForEach {} iteration {} failed: {}",
                failure.position, failure.iteration, failure.error
            )
            .yellow()
        );
    }
    Ok(())
}

/// Handle the version command
pub fn handle_version() {
    println!("{} {}", "graphchain".bold().green(), env!("CARGO_PKG_VERSION"));
    println!("  Store backends: {}", "memory".cyan());
}

fn build_graph(schema: &[PathBuf], properties: StoreProperties) -> Result<Graph, CliError> {
    let schema = Schema::from_json_files(schema)?;
    let graph = Graph::builder()
        .config(GraphConfig::new("cli"))
        .schema(schema)
        .store_properties(properties)
        .build()?;
    Ok(graph)
}

fn load_elements(path: &Path) -> Result<Vec<Element>, CliError> {
    let json = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| CliError::Json {
        path: path.display().to_string(),
        source,
    })
}
