//! # OKR CLI Module
//!
//! This module implements the command-line interface for the OKR engine.
//!
//! ## Available Commands
//!
//! - `show` - List visible objectives with their key results
//! - `rollup` - Recalculate progress and status up from an objective
//! - `check-in` - Record a new key result value
//! - `transition` - Move an objective or key result to a lifecycle state
//! - `locks` - Report which locks an edit of an objective would face
//!
//! Mutations run against an in-memory copy of the data file and are only
//! written back with `--write`.

mod commands;

use crate::config::AppConfig;
use crate::error::AppError;
use clap::{Parser, Subcommand};
use okr_core::{
    Actor, MemoryStore, OkrService, SerializableStore, StaticRbac, SystemClock, TenantIdentity,
    TracingSink,
};
use std::io::Write;
use std::path::{Path, PathBuf};

pub use commands::*;

/// Service wired the way every command runs it.
pub type CliService = OkrService<MemoryStore, StaticRbac, SystemClock>;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// OKR governance and rollup engine.
///
/// Applies tenant isolation, lifecycle rules and governance locks to a JSON
/// data file of objectives and key results.
#[derive(Parser, Debug)]
#[command(name = "okr")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short = 'c', long, global = true, default_value = "okr.toml")]
    pub config: PathBuf,

    /// Path to the JSON data file
    #[arg(short = 'D', long, global = true, default_value = "okr.json")]
    pub data: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Persist mutations back to the data file
    #[arg(short, long, global = true)]
    pub write: bool,

    /// Acting user id
    #[arg(short, long, global = true, default_value = "cli")]
    pub user: String,

    /// Tenant the acting user belongs to
    #[arg(short, long, global = true)]
    pub tenant: Option<String>,

    /// Act as a cross-tenant, read-only superuser
    #[arg(long, global = true)]
    pub superuser: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The actor every command runs as.
    pub fn actor(&self) -> Actor {
        Actor::new(
            self.user.as_str(),
            TenantIdentity::from_claims(self.tenant.as_deref(), self.superuser),
        )
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List visible objectives and their key results
    Show,

    /// Recalculate progress and status from an objective up to its root
    Rollup {
        /// Objective to start from
        #[arg(short, long)]
        objective: String,
    },

    /// Record a new value for a key result
    CheckIn {
        /// Key result to update
        #[arg(short, long)]
        key_result: String,

        /// New current value
        #[arg(short, long, allow_negative_numbers = true)]
        value: f64,

        /// Reject the check-in unless the key result is at this version
        #[arg(long)]
        expected_version: Option<u64>,

        /// Operational status to set (ON_TRACK, AT_RISK, ...)
        #[arg(short, long)]
        status: Option<String>,

        /// Free-text note stored with the check-in
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Move an objective or key result to another lifecycle state
    Transition {
        /// Objective to transition
        #[arg(short, long, conflicts_with = "key_result", required_unless_present = "key_result")]
        objective: Option<String>,

        /// Key result to transition
        #[arg(short, long)]
        key_result: Option<String>,

        /// Target state (DRAFT, PUBLISHED, COMPLETED, CANCELLED, ARCHIVED)
        #[arg(long)]
        to: String,
    },

    /// Show the lock decisions an edit of an objective would face
    Locks {
        /// Objective to inspect
        #[arg(short, long)]
        objective: String,
    },
}

impl Commands {
    /// Whether the command can change the data file.
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Rollup { .. } | Commands::CheckIn { .. } | Commands::Transition { .. }
        )
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments, writing results to `out`.
pub fn execute(cli: Cli, config: &AppConfig, out: &mut dyn Write) -> Result<(), AppError> {
    let actor = cli.actor();
    let json = cli.json;
    let command = cli.command.unwrap_or(Commands::Show);
    tracing::debug!(user = %actor.user_id, tenant = %actor.tenant, ?command, "executing");

    let mut service =
        OkrService::new(load_store(&cli.data)?, config.rbac(), SystemClock).with_sink(TracingSink);

    let mutates = command.mutates();
    match command {
        Commands::Show => cmd_show(&service, &actor, json, out)?,
        Commands::Rollup { objective } => cmd_rollup(&mut service, &actor, json, &objective, out)?,
        Commands::CheckIn {
            key_result,
            value,
            expected_version,
            status,
            note,
        } => cmd_check_in(
            &mut service,
            &actor,
            json,
            CheckInArgs {
                key_result,
                value,
                expected_version,
                status,
                note,
            },
            out,
        )?,
        Commands::Transition {
            objective,
            key_result,
            to,
        } => cmd_transition(&mut service, &actor, json, objective, key_result, &to, out)?,
        Commands::Locks { objective } => cmd_locks(&service, &actor, json, &objective, out)?,
    }

    if mutates {
        if cli.write {
            save_store(&cli.data, service.store())?;
            tracing::info!(path = %cli.data.display(), "data file written");
        } else {
            tracing::info!("dry run: pass --write to persist changes");
        }
    }
    Ok(())
}

// =============================================================================
// DATA FILE
// =============================================================================

/// Load the data file; a missing file is an empty store.
pub fn load_store(path: &Path) -> Result<MemoryStore, AppError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no data file, starting empty");
        return Ok(MemoryStore::new());
    }
    let text = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
    let data: SerializableStore = serde_json::from_str(&text)?;
    Ok(MemoryStore::from(data))
}

/// Write the store back as pretty JSON.
pub fn save_store(path: &Path, store: &MemoryStore) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(&SerializableStore::from(store))?;
    std::fs::write(path, text).map_err(|e| AppError::io(path, e))
}
