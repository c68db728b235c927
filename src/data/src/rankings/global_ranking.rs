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

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::primitives::{CardId, TenantId};

/// Rating assigned to a card the first time it is observed in a vote.
pub const INITIAL_RATING: i32 = 1000;

/// A card's standing in the tenant-wide ELO table.
///
/// Entries are upsert-only, keyed by `(tenant_id, card_id)`, and overwritten
/// in bulk by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalRankingEntry {
    pub tenant_id: TenantId,
    pub card_id: CardId,
    pub elo_rating: i32,
    pub wins: u32,
    pub losses: u32,
    pub total_games: u32,
    /// `wins / total_games`, rounded to three decimals; 0 with no games.
    pub win_rate: f64,
    pub last_updated: DateTime<Utc>,
}

impl GlobalRankingEntry {
    /// A fresh entry for a card never rated before.
    pub fn seed(tenant_id: TenantId, card_id: CardId, now: DateTime<Utc>) -> Self {
        Self {
            tenant_id,
            card_id,
            elo_rating: INITIAL_RATING,
            wins: 0,
            losses: 0,
            total_games: 0,
            win_rate: 0.0,
            last_updated: now,
        }
    }
}

/// The total order used for leaderboard display.
///
/// Rating descending, then win rate descending, then games descending, then
/// recency descending, then card id ascending. The final key makes the order
/// total, so leaderboards are reproducible.
pub fn leaderboard_order(a: &GlobalRankingEntry, b: &GlobalRankingEntry) -> Ordering {
    b.elo_rating
        .cmp(&a.elo_rating)
        .then_with(|| b.win_rate.total_cmp(&a.win_rate))
        .then_with(|| b.total_games.cmp(&a.total_games))
        .then_with(|| b.last_updated.cmp(&a.last_updated))
        .then_with(|| a.card_id.cmp(&b.card_id))
}
