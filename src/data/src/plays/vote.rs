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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::primitives::CardId;

/// A pairwise comparison used to position a liked card.
///
/// Invariant: `winner` is one of the two cards and the cards are distinct.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub card_a: CardId,
    pub card_b: CardId,
    pub winner: CardId,
    pub timestamp: DateTime<Utc>,

    /// True when the timeout policy resolved this vote instead of the user.
    #[serde(default)]
    pub timed_out: bool,
}

impl Vote {
    /// The card `card` was compared against, if `card` is in this pair.
    pub fn opponent_of(&self, card: CardId) -> Option<CardId> {
        if self.card_a == card {
            Some(self.card_b)
        } else if self.card_b == card {
            Some(self.card_a)
        } else {
            None
        }
    }

    /// True when this vote compares the unordered pair `{a, b}`.
    pub fn involves_pair(&self, a: CardId, b: CardId) -> bool {
        (self.card_a == a && self.card_b == b) || (self.card_a == b && self.card_b == a)
    }
}
