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

use serde::{Deserialize, Serialize};

use crate::core::primitives::{CardId, PlayId};

/// Where a play stands in the hierarchical decision tree.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum HierarchicalPhase {
    /// No hierarchical processing has started.
    None,
    /// The play's ranked parents are being worked through.
    Parents,
    /// This play ranks the children of a single parent card.
    Children,
    /// The hierarchical ranking has been computed.
    Finalized,
}

/// The child sub-session currently in flight for a parent play.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActiveChild {
    /// The parent card whose children the sub-session ranks.
    pub parent_card: CardId,
    pub play: PlayId,
}

/// A finished child ranking, recorded under its parent card.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChildResult {
    pub parent: CardId,
    pub ranking: Vec<CardId>,
}

/// Aggregation state owned by a play whose ranking contains parent cards.
///
/// Persisted inside the play so that a process restart resumes pending
/// children instead of losing them. Child plays never carry this; they hold
/// only `parent_play_id`.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalState {
    /// Ranked parents whose child sub-sessions have not finished, in
    /// parent-rank order.
    pub pending: Vec<CardId>,

    /// The sub-session currently awaiting user input, if any.
    pub active: Option<ActiveChild>,

    /// Finished child rankings, in the order they completed.
    pub results: Vec<ChildResult>,

    /// The spliced ranking, present once every child has reported.
    pub final_ranking: Option<Vec<CardId>>,
}

impl HierarchicalState {
    pub fn result_for(&self, parent: CardId) -> Option<&[CardId]> {
        self.results.iter().find(|r| r.parent == parent).map(|r| r.ranking.as_slice())
    }
}
