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

/// Half-open index interval `[start, end)` of a ranking still consistent
/// with a card's recorded comparisons.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Bounds {
    pub start: usize,
    pub end: usize,
}

impl Bounds {
    /// True when the interval is empty and the card's position is decided.
    pub fn collapsed(&self) -> bool {
        self.start >= self.end
    }

    /// Number of candidate positions remaining.
    pub fn window(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// The index a collapsed card inserts at, clamped to the ranking.
    pub fn insert_index(&self, ranking_len: usize) -> usize {
        self.start.min(ranking_len)
    }
}

/// Accumulates every recorded comparison involving `card` into bounds over
/// `ranking`.
///
/// The ranking runs from most preferred (index 0) to least. Beating a ranked
/// card constrains `card` strictly above it; losing to one constrains it
/// strictly below. Votes against cards not currently in the ranking carry no
/// positional information and are skipped.
pub fn accumulated_bounds(ranking: &[CardId], card: CardId, votes: &[Vote]) -> Bounds {
    let mut start = 0;
    let mut end = ranking.len();
    for vote in votes {
        let Some(opponent) = vote.opponent_of(card) else {
            continue;
        };
        let Some(index) = ranking.iter().position(|&c| c == opponent) else {
            continue;
        };
        if vote.winner == card {
            end = end.min(index);
        } else {
            start = start.max(index + 1);
        }
    }
    Bounds { start, end }
}
