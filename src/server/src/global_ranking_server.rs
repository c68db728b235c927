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

use std::collections::HashSet;

use dashmap::DashMap;
use data::core::config::EngineConfig;
use data::core::errors::{EngineError, Value};
use data::core::primitives::{CardId, TenantId};
use data::rankings::global_ranking::{leaderboard_order, GlobalRankingEntry};
use database::database::Database;
use rules::elo::replay::{self, ReplaySummary};
use tracing::{info, instrument};
use utils::clock::Clock;

/// Per-tenant advisory lock over global-ranking runs.
///
/// One guard is constructed per service instance; overlapping recomputes on
/// the same tenant are refused with `AlreadyRunning` rather than queued, so
/// rating writes never interleave.
#[derive(Default)]
pub struct RecomputeGuard {
    running: DashMap<TenantId, ()>,
}

impl RecomputeGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&self, tenant_id: TenantId) -> Value<()> {
        if self.running.insert(tenant_id, ()).is_some() {
            return Err(EngineError::AlreadyRunning(tenant_id));
        }
        Ok(())
    }

    fn finish(&self, tenant_id: TenantId) {
        self.running.remove(&tenant_id);
    }
}

/// Replays the tenant's recent completed plays into fresh ELO ratings and
/// bulk-writes the result.
///
/// All-or-nothing: a failed write aborts the run with the table untouched.
/// Plays beyond the configured window stay persisted and enter a later run.
#[instrument(level = "debug", skip(database, config, clock, guard))]
pub async fn recompute(
    database: &impl Database,
    config: &EngineConfig,
    clock: &Clock,
    guard: &RecomputeGuard,
    tenant_id: TenantId,
) -> Value<ReplaySummary> {
    guard.begin(tenant_id)?;
    let result = run(database, config, clock, tenant_id).await;
    guard.finish(tenant_id);
    result
}

async fn run(
    database: &impl Database,
    config: &EngineConfig,
    clock: &Clock,
    tenant_id: TenantId,
) -> Value<ReplaySummary> {
    let plays = database.completed_plays(tenant_id, config.elo_window).await?;
    let known_cards: HashSet<CardId> =
        database.fetch_cards(tenant_id).await?.iter().map(|card| card.id).collect();
    let seed = database.fetch_rankings(tenant_id).await?;

    let (entries, summary) =
        replay::replay(tenant_id, &plays, &known_cards, &seed, config.elo_k, clock.now());
    if !entries.is_empty() {
        database.write_rankings(tenant_id, &entries).await?;
    }

    info!(
        ?tenant_id,
        plays = summary.plays_scanned,
        applied = summary.votes_applied,
        dropped = summary.votes_dropped,
        cards = summary.cards_updated,
        "Recomputed global rankings"
    );
    Ok(summary)
}

/// The tenant's leaderboard in display order.
pub async fn leaderboard(
    database: &impl Database,
    tenant_id: TenantId,
) -> Value<Vec<GlobalRankingEntry>> {
    let mut entries = database.fetch_rankings(tenant_id).await?;
    entries.sort_by(leaderboard_order);
    Ok(entries)
}
