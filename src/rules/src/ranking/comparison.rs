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

use data::core::primitives::CardId;
use data::plays::vote::Vote;

use crate::ranking::bounds::{accumulated_bounds, Bounds};

/// A proposed comparison for positioning `new_card`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub new_card: CardId,
    pub compare_with: CardId,
    pub bounds: Bounds,
    /// Fraction of the open window this comparison eliminates at minimum.
    pub information_gain: f64,
}

/// Selects the next comparison for positioning `card`, or `None` when no
/// comparison is required: the ranking is empty, the accumulated bounds have
/// collapsed, or every card in the open window has already been compared
/// against `card` (the caller inserts at the lower bound in that last,
/// defensive case).
///
/// The midpoint of the open window is preferred; a pair that has already
/// been voted on is never proposed again, falling back to the nearest
/// un-compared card in the window.
pub fn next_comparison(ranking: &[CardId], card: CardId, votes: &[Vote]) -> Option<Comparison> {
    if ranking.is_empty() {
        return None;
    }
    let bounds = accumulated_bounds(ranking, card, votes);
    if bounds.collapsed() {
        return None;
    }

    let already_compared: HashSet<CardId> =
        votes.iter().filter_map(|v| v.opponent_of(card)).collect();
    let mid = bounds.start + bounds.window() / 2;
    let mut candidates: Vec<usize> = (bounds.start..bounds.end).collect();
    candidates.sort_by_key(|&i| (i.abs_diff(mid), i));

    let compare_with = candidates
        .into_iter()
        .map(|i| ranking[i])
        .find(|candidate| !already_compared.contains(candidate))?;

    Some(Comparison {
        new_card: card,
        compare_with,
        bounds,
        information_gain: 1.0 / bounds.window() as f64,
    })
}
