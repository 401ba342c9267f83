//! Catalog commands: operators, parts, params.

use std::path::Path;

use clap::Subcommand;

use crate::catalog::{Catalog, FileCatalog};

use super::format::format_thresholds;

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// List known operators.
    Operators,

    /// List known part descriptions.
    Parts,

    /// Show saved thresholds for a part description, with their history.
    Params {
        /// Part description, exactly as recorded.
        description: String,
    },
}

fn open_catalog(data_dir: &Path) -> Result<FileCatalog, String> {
    FileCatalog::open(FileCatalog::default_path(data_dir))
        .map_err(|e| format!("failed to open catalog: {e}"))
}

pub(super) fn cmd_operators(data_dir: &Path) -> Result<(), String> {
    print_list(&open_catalog(data_dir)?.operators(), "No operators");
    Ok(())
}

pub(super) fn cmd_parts(data_dir: &Path) -> Result<(), String> {
    print_list(
        &open_catalog(data_dir)?.part_descriptions(),
        "No part descriptions",
    );
    Ok(())
}

pub(super) fn cmd_params(data_dir: &Path, description: &str) -> Result<(), String> {
    let catalog = open_catalog(data_dir)?;
    let Some(current) = catalog.part_parameters(description) else {
        return Err(format!("no thresholds saved for '{description}'"));
    };

    println!("{description}: {}", format_thresholds(current));
    let history = catalog.parameter_history(description);
    if history.len() > 1 {
        println!("History (oldest first):");
        for thresholds in history {
            println!("  {}", format_thresholds(thresholds));
        }
    }

    Ok(())
}

fn print_list(items: &[String], empty: &str) {
    if items.is_empty() {
        println!("{empty}");
        return;
    }
    for item in items {
        println!("{item}");
    }
}
