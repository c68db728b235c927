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

use chrono::{DateTime, Duration, Utc};
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::core::primitives::{CardId, HashTag, PlayId, SessionId, TenantId};
use crate::plays::hierarchy::{HierarchicalPhase, HierarchicalState};
use crate::plays::swipe::Swipe;
use crate::plays::vote::Vote;

/// Namespace for deriving deterministic deck identifiers via UUID v5.
pub const DECK_NAMESPACE: Uuid = Uuid::from_u128(0x8c9e_6f42_1b3a_4d78_9e5f_02c4a7d1b6e3);

/// Lifecycle of a play as a whole.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum PlayStatus {
    /// Accepting swipes and votes.
    Active,
    /// Deck exhausted; child sub-sessions are ranking parents' children.
    WaitingForChildren,
    /// Finished. `completed_at` is set exactly when this status is entered.
    Completed,
    /// TTL elapsed. All input is rejected; a sweeper deletes the record.
    Expired,
}

/// What kind of input the play currently accepts.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum PlayPhase {
    /// The next unswiped deck card awaits a like/dislike decision.
    Swiping,
    /// A pairwise comparison is pending; only the matching vote is valid.
    Voting,
    /// No further input is accepted.
    Completed,
}

/// An unordered-comparable pair pending a vote.
///
/// `card_a` is always the card being positioned; `card_b` is the ranked card
/// it is compared against.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct CardPair {
    pub card_a: CardId,
    pub card_b: CardId,
}

impl CardPair {
    /// True when `{a, b}` equals this pair, in either order.
    pub fn matches(&self, a: CardId, b: CardId) -> bool {
        (self.card_a == a && self.card_b == b) || (self.card_a == b && self.card_b == a)
    }

    pub fn contains(&self, card: CardId) -> bool {
        self.card_a == card || self.card_b == card
    }
}

/// One user's run through a deck, producing a personal ranking.
///
/// Plays are mutated only through the engine's input operations; every
/// committed mutation increments `version` by exactly one and is persisted
/// with a conditional update on the previous version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Play {
    pub id: PlayId,
    pub tenant_id: TenantId,

    /// Browser session that created this play. Informational only.
    pub session_id: SessionId,

    /// Deterministic hash of the deck tag and the sorted card set, shared
    /// by plays over identical decks.
    pub deck_uuid: Uuid,

    pub deck_tag: HashTag,

    /// The initial shuffle. Never reordered after creation.
    pub deck: Vec<CardId>,

    pub status: PlayStatus,
    pub phase: PlayPhase,

    /// Monotonic optimistic-concurrency version.
    pub version: u64,

    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,

    /// Append-only, in deck-consumption order.
    pub swipes: Vec<Swipe>,

    /// Append-only, in decision order.
    pub votes: Vec<Vote>,

    /// Most preferred first.
    pub personal_ranking: Vec<CardId>,

    /// The comparison awaiting a vote. Present exactly when `phase` is
    /// [PlayPhase::Voting].
    pub current_pair: Option<CardPair>,

    pub hierarchical_phase: HierarchicalPhase,

    /// Present only on child plays; a weak back-reference resolved by
    /// lookup, never by ownership.
    pub parent_play_id: Option<PlayId>,

    /// Aggregation state for plays that own child sub-sessions.
    pub hierarchical_state: Option<HierarchicalState>,

    /// Deck members that had at least two active children when the play was
    /// created. Drives the hierarchical trigger on completion.
    pub parent_eligible: Vec<CardId>,

    /// Nesting depth: 0 for root plays, parent depth + 1 for children.
    pub depth: u32,

    /// Per-play random number generator, seeded from OS entropy at creation
    /// and persisted, so a resumed play draws the same sequence.
    pub rng: Xoshiro256StarStar,
}

/// Arguments for [Play::new]. Optional fields default to a root play.
#[derive(Debug, TypedBuilder)]
pub struct NewPlay {
    pub id: PlayId,
    pub tenant_id: TenantId,
    pub session_id: SessionId,
    pub deck_uuid: Uuid,
    pub deck_tag: HashTag,
    pub deck: Vec<CardId>,
    pub parent_eligible: Vec<CardId>,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: i64,
    pub rng: Xoshiro256StarStar,
    #[builder(default)]
    pub parent_play_id: Option<PlayId>,
    #[builder(default)]
    pub depth: u32,
    #[builder(default = HierarchicalPhase::None)]
    pub hierarchical_phase: HierarchicalPhase,
}

impl Play {
    pub fn new(params: NewPlay) -> Self {
        Self {
            id: params.id,
            tenant_id: params.tenant_id,
            session_id: params.session_id,
            deck_uuid: params.deck_uuid,
            deck_tag: params.deck_tag,
            deck: params.deck,
            status: PlayStatus::Active,
            phase: PlayPhase::Swiping,
            version: 0,
            created_at: params.created_at,
            last_activity: params.created_at,
            completed_at: None,
            expires_at: params.created_at + Duration::seconds(params.ttl_seconds),
            swipes: vec![],
            votes: vec![],
            personal_ranking: vec![],
            current_pair: None,
            hierarchical_phase: params.hierarchical_phase,
            parent_play_id: params.parent_play_id,
            hierarchical_state: None,
            parent_eligible: params.parent_eligible,
            depth: params.depth,
            rng: params.rng,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn has_swiped(&self, card: CardId) -> bool {
        self.swipes.iter().any(|s| s.card_id == card)
    }

    pub fn swipe_for(&self, card: CardId) -> Option<&Swipe> {
        self.swipes.iter().find(|s| s.card_id == card)
    }

    /// The first deck card with no recorded swipe. Deck order is fixed at
    /// creation.
    pub fn next_unswiped(&self) -> Option<CardId> {
        self.deck.iter().copied().find(|&card| !self.has_swiped(card))
    }

    pub fn is_ranked(&self, card: CardId) -> bool {
        self.personal_ranking.contains(&card)
    }

    /// The ranking a consumer of this play should read: the spliced
    /// hierarchical ranking when one exists, the personal ranking otherwise.
    pub fn final_ranking(&self) -> &[CardId] {
        self.hierarchical_state
            .as_ref()
            .and_then(|state| state.final_ranking.as_deref())
            .unwrap_or(&self.personal_ranking)
    }
}

/// Derives the deterministic deck identifier from the deck tag and the
/// (unshuffled) card set.
pub fn deck_uuid(deck_tag: &HashTag, card_ids: &[CardId]) -> Uuid {
    let mut sorted: Vec<String> = card_ids.iter().map(|c| c.0.to_string()).collect();
    sorted.sort();
    let material = format!("{}|{}", deck_tag, sorted.join(","));
    Uuid::new_v5(&DECK_NAMESPACE, material.as_bytes())
}
