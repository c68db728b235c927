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

use data::core::primitives::CardId;
use data::plays::vote::Vote;

use crate::ranking::bounds::accumulated_bounds;

/// Result of attempting to place a card into a ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// The card's position is decided; the returned ranking contains it at
    /// `index`.
    Inserted { ranking: Vec<CardId>, index: usize },
    /// The recorded votes do not yet pin down a position.
    NeedsMoreComparisons,
}

/// Attempts to insert `card` at the position pinned down by the accumulated
/// vote bounds.
///
/// Inserting a card that is already ranked is a no-op returning the ranking
/// unchanged, so replayed inputs cannot duplicate entries. An empty ranking
/// accepts the card unconditionally at index 0.
pub fn insert_card(ranking: &[CardId], card: CardId, votes: &[Vote]) -> Insertion {
    if let Some(index) = ranking.iter().position(|&c| c == card) {
        return Insertion::Inserted { ranking: ranking.to_vec(), index };
    }
    if ranking.is_empty() {
        return Insertion::Inserted { ranking: vec![card], index: 0 };
    }

    let bounds = accumulated_bounds(ranking, card, votes);
    if !bounds.collapsed() {
        return Insertion::NeedsMoreComparisons;
    }
    let index = bounds.insert_index(ranking.len());
    let mut updated = ranking.to_vec();
    updated.insert(index, card);
    Insertion::Inserted { ranking: updated, index }
}

/// Inserts at the lower bound even though the window is still open.
///
/// This is the escape hatch for the defensive case where comparison
/// selection has no un-compared candidate left; stalling would wedge the
/// play.
pub fn force_insert(ranking: &[CardId], card: CardId, votes: &[Vote]) -> (Vec<CardId>, usize) {
    if let Some(index) = ranking.iter().position(|&c| c == card) {
        return (ranking.to_vec(), index);
    }
    let bounds = accumulated_bounds(ranking, card, votes);
    let index = bounds.insert_index(ranking.len());
    let mut updated = ranking.to_vec();
    updated.insert(index, card);
    (updated, index)
}
