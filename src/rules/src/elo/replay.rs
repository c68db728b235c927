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

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use data::core::primitives::{CardId, TenantId};
use data::plays::play::Play;
use data::plays::vote::Vote;
use data::rankings::global_ranking::GlobalRankingEntry;
use itertools::Itertools;
use tracing::warn;
use utils::numerics;

/// Counters reported by one aggregation run.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ReplaySummary {
    pub plays_scanned: usize,
    pub votes_applied: usize,
    /// Malformed legacy votes skipped with a warning.
    pub votes_dropped: usize,
    pub cards_updated: usize,
}

/// Expected score of a card rated `rating` against `opponent`.
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(opponent - rating) / 400.0))
}

/// Replays every valid vote from `plays` chronologically over the seeded
/// rating table.
///
/// Votes are ordered by `(timestamp, play id, vote index)` so runs over the
/// same inputs are reproducible even under equal timestamps. Each step
/// rounds half-to-even, preventing systemic drift. Returns the entries for
/// every card touched by a replayed vote, plus run counters; untouched seed
/// entries are not rewritten.
pub fn replay(
    tenant_id: TenantId,
    plays: &[Play],
    known_cards: &HashSet<CardId>,
    seed: &[GlobalRankingEntry],
    k: f64,
    now: DateTime<Utc>,
) -> (Vec<GlobalRankingEntry>, ReplaySummary) {
    let mut table: BTreeMap<CardId, GlobalRankingEntry> =
        seed.iter().map(|entry| (entry.card_id, entry.clone())).collect();
    let mut touched: HashSet<CardId> = HashSet::new();
    let mut summary = ReplaySummary { plays_scanned: plays.len(), ..Default::default() };

    let ordered = plays
        .iter()
        .flat_map(|play| {
            play.votes.iter().enumerate().map(move |(index, vote)| (play.id, index, vote))
        })
        .sorted_by_key(|&(play_id, index, vote)| (vote.timestamp, play_id, index));

    for (play_id, index, vote) in ordered {
        if let Some(reason) = drop_reason(vote, known_cards) {
            warn!(?play_id, index, reason, "Dropping malformed vote");
            summary.votes_dropped += 1;
            continue;
        }

        table
            .entry(vote.card_a)
            .or_insert_with(|| GlobalRankingEntry::seed(tenant_id, vote.card_a, now));
        table
            .entry(vote.card_b)
            .or_insert_with(|| GlobalRankingEntry::seed(tenant_id, vote.card_b, now));
        let rating_a = table[&vote.card_a].elo_rating;
        let rating_b = table[&vote.card_b].elo_rating;

        let expected_a = expected_score(rating_a, rating_b);
        let score_a = if vote.winner == vote.card_a { 1.0 } else { 0.0 };
        let next_a =
            numerics::round_half_to_even(f64::from(rating_a) + k * (score_a - expected_a)) as i32;
        let next_b = numerics::round_half_to_even(
            f64::from(rating_b) + k * ((1.0 - score_a) - (1.0 - expected_a)),
        ) as i32;

        settle(&mut table, vote.card_a, next_a, vote.winner == vote.card_a, now);
        settle(&mut table, vote.card_b, next_b, vote.winner == vote.card_b, now);
        touched.insert(vote.card_a);
        touched.insert(vote.card_b);
        summary.votes_applied += 1;
    }

    summary.cards_updated = touched.len();
    let entries =
        table.into_values().filter(|entry| touched.contains(&entry.card_id)).collect();
    (entries, summary)
}

fn drop_reason(vote: &Vote, known_cards: &HashSet<CardId>) -> Option<&'static str> {
    if vote.card_a == vote.card_b {
        return Some("self-comparison");
    }
    if vote.winner != vote.card_a && vote.winner != vote.card_b {
        return Some("winner outside the pair");
    }
    if !known_cards.contains(&vote.card_a) || !known_cards.contains(&vote.card_b) {
        return Some("card no longer exists");
    }
    None
}

fn settle(
    table: &mut BTreeMap<CardId, GlobalRankingEntry>,
    card: CardId,
    rating: i32,
    won: bool,
    now: DateTime<Utc>,
) {
    let Some(entry) = table.get_mut(&card) else {
        return;
    };
    entry.elo_rating = rating;
    entry.total_games += 1;
    if won {
        entry.wins += 1;
    } else {
        entry.losses += 1;
    }
    entry.win_rate = if entry.total_games > 0 {
        numerics::round_to_places(f64::from(entry.wins) / f64::from(entry.total_games), 3)
    } else {
        0.0
    };
    entry.last_updated = now;
}
