// Copyright © narimato 2024-present
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use config::{Config, Environment};
use data::core::config::{
    EngineConfig, DEFAULT_ELO_K, DEFAULT_ELO_WINDOW, DEFAULT_MAX_HIERARCHY_DEPTH,
    DEFAULT_PLAY_TTL_SECONDS,
};
use data::core::primitives::TenantId;
use database::sled_database::SledDatabase;
use directories::ProjectDirs;
use server::{expiry_server, global_ranking_server};
use tracing::info;
use tracing_subscriber::EnvFilter;
use utils::clock::Clock;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Operator tools for the narimato ranking engine")]
struct Cli {
    /// Sled database directory. Defaults to the platform data directory.
    #[arg(long)]
    database_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay the tenant's recent completed plays into the global ELO table.
    RecomputeGlobal { tenant_id: Uuid },

    /// Delete plays whose TTL has elapsed.
    ExpirePlays,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = engine_config()?;
    let database = SledDatabase::new(database_path(cli.database_path)?)?;
    let clock = Clock::System;

    match cli.command {
        Command::RecomputeGlobal { tenant_id } => {
            let guard = global_ranking_server::RecomputeGuard::new();
            let summary = global_ranking_server::recompute(
                &database,
                &config,
                &clock,
                &guard,
                TenantId(tenant_id),
            )
            .await?;
            info!(
                plays = summary.plays_scanned,
                applied = summary.votes_applied,
                dropped = summary.votes_dropped,
                cards = summary.cards_updated,
                "Recompute finished"
            );
        }
        Command::ExpirePlays => {
            let count = expiry_server::expire_plays(&database, &clock).await?;
            info!(count, "Expiry sweep finished");
        }
    }
    Ok(())
}

/// Engine settings from the environment: `PLAY_TTL_SECONDS`, `ELO_WINDOW`,
/// `ELO_K`, `MAX_HIERARCHY_DEPTH`, `VOTE_TIMEOUT_SECONDS`.
fn engine_config() -> Result<EngineConfig> {
    let settings = Config::builder()
        .set_default("play_ttl_seconds", DEFAULT_PLAY_TTL_SECONDS)?
        .set_default("elo_window", DEFAULT_ELO_WINDOW as i64)?
        .set_default("elo_k", DEFAULT_ELO_K)?
        .set_default("max_hierarchy_depth", DEFAULT_MAX_HIERARCHY_DEPTH as i64)?
        .add_source(Environment::default())
        .build()?;

    Ok(EngineConfig {
        play_ttl_seconds: settings.get_int("play_ttl_seconds")?,
        elo_window: settings.get_int("elo_window")? as usize,
        elo_k: settings.get_float("elo_k")?,
        max_hierarchy_depth: settings.get_int("max_hierarchy_depth")? as u32,
        vote_timeout_seconds: settings.get_int("vote_timeout_seconds").ok(),
    })
}

fn database_path(override_path: Option<PathBuf>) -> Result<String> {
    let path = match override_path {
        Some(path) => path,
        None => ProjectDirs::from("com", "narimato", "narimato")
            .ok_or_else(|| eyre!("No home directory available for the default database path"))?
            .data_dir()
            .join("db"),
    };
    Ok(path.to_string_lossy().into_owned())
}
