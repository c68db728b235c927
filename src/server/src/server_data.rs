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

use data::core::primitives::{CardId, PlayId, SessionId, TenantId};
use data::plays::play::{CardPair, Play, PlayPhase, PlayStatus};
use data::plays::swipe::Direction;
use serde::{Deserialize, Serialize};

/// Request to start a play over the deck induced by `deck_tag`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartPlayRequest {
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub deck_tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartPlayResponse {
    pub play_id: PlayId,
    pub current_card: CardId,
    pub total_cards: usize,
    /// True when the deck contains at least one parent-eligible card, so
    /// completing it may fork child sub-sessions.
    pub is_hierarchical: bool,
    pub version: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SwipeRequest {
    pub play_id: PlayId,
    pub card_id: CardId,
    pub direction: Direction,
    /// The version the client last observed. Omitting it skips the
    /// client-side staleness check; the conditional write still applies.
    pub version: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeResponse {
    pub next_card: Option<CardId>,
    pub requires_voting: bool,
    pub current_pair: Option<CardPair>,
    pub completed: bool,
    pub new_version: u64,
    /// True when the identical input had already been applied and this
    /// response reports the existing state.
    pub already_applied: bool,
}

impl SwipeResponse {
    pub(crate) fn from_play(play: &Play, already_applied: bool) -> Self {
        Self {
            next_card: next_card_of(play),
            requires_voting: play.phase == PlayPhase::Voting,
            current_pair: play.current_pair,
            completed: play.phase == PlayPhase::Completed,
            new_version: play.version,
            already_applied,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoteRequest {
    pub play_id: PlayId,
    pub card_a: CardId,
    pub card_b: CardId,
    pub winner: CardId,
    pub version: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub next_card: Option<CardId>,
    pub requires_more_voting: bool,
    pub current_pair: Option<CardPair>,
    /// True when the vote settled the card's position and swiping resumed.
    pub returned_to_swiping: bool,
    pub completed: bool,
    pub new_version: u64,
    pub already_applied: bool,
}

impl VoteResponse {
    pub(crate) fn from_play(play: &Play, already_applied: bool) -> Self {
        Self {
            next_card: next_card_of(play),
            requires_more_voting: play.phase == PlayPhase::Voting,
            current_pair: play.current_pair,
            returned_to_swiping: play.phase == PlayPhase::Swiping,
            completed: play.phase == PlayPhase::Completed,
            new_version: play.version,
            already_applied,
        }
    }
}

fn next_card_of(play: &Play) -> Option<CardId> {
    match (play.status, play.phase) {
        (PlayStatus::Active, PlayPhase::Swiping) => play.next_unswiped(),
        _ => None,
    }
}
