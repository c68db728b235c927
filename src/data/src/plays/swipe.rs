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

/// Direction of a swipe.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Dislike: the card is skipped and never ranked.
    Left,
    /// Like: the card enters the personal ranking.
    Right,
}

/// A single binary decision on the current card.
///
/// Swipes are appended strictly in the order the deck is consumed and are
/// never rewritten.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Swipe {
    pub card_id: CardId,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
}
