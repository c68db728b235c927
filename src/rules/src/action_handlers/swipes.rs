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
use data::core::errors::{EngineError, Value};
use data::core::primitives::CardId;
use data::plays::play::{CardPair, Play, PlayPhase};
use data::plays::swipe::{Direction, Swipe};
use tracing::{debug, warn};

use crate::hierarchy::splice::{self, CompletionKind};
use crate::queries::play_queries;
use crate::ranking::comparison;
use crate::ranking::insertion::{self, Insertion};

/// What a swipe did to the play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipeUpdate {
    /// True when the identical swipe was already recorded and nothing
    /// changed.
    pub already_applied: bool,

    /// The card to present next, when the play stayed in (or returned to)
    /// the swipe loop.
    pub next_card: Option<CardId>,

    /// True when the swipe opened a comparison.
    pub requires_voting: bool,
    pub current_pair: Option<CardPair>,

    /// True when the play has left its swipe/vote loop.
    pub completed: bool,

    /// Set when this input exhausted the deck; tells the orchestration
    /// layer whether child sub-sessions are owed.
    pub deck_exhausted: Option<CompletionKind>,
}

impl SwipeUpdate {
    /// The current state of the play, reported for an idempotent replay.
    fn snapshot(play: &Play) -> Self {
        Self {
            already_applied: true,
            next_card: match play.phase {
                PlayPhase::Swiping => play.next_unswiped(),
                _ => None,
            },
            requires_voting: play.phase == PlayPhase::Voting,
            current_pair: play.current_pair,
            completed: play.phase == PlayPhase::Completed,
            deck_exhausted: None,
        }
    }
}

/// Applies one swipe to `play`.
///
/// Guard order matters: expiry first, then idempotent replay (so retries of
/// an applied input succeed even after the play moved on), then the client
/// version, status, phase, and card checks.
pub fn execute(
    play: &mut Play,
    card_id: CardId,
    direction: Direction,
    client_version: Option<u64>,
    now: DateTime<Utc>,
) -> Value<SwipeUpdate> {
    play_queries::ensure_not_expired(play, now)?;

    if let Some(swipe) = play.swipe_for(card_id) {
        if swipe.direction == direction {
            return Ok(SwipeUpdate::snapshot(play));
        }
        return Err(EngineError::DuplicateInput { play: play.id });
    }

    play_queries::ensure_version(play, client_version)?;
    play_queries::ensure_accepts_input(play)?;
    if play.phase != PlayPhase::Swiping {
        return Err(EngineError::WrongState { play: play.id, phase: play.phase });
    }
    let Some(expected) = play.next_unswiped() else {
        return Err(EngineError::InvariantViolation {
            play: play.id,
            detail: "swiping phase with an exhausted deck".into(),
        });
    };
    if card_id != expected {
        return Err(EngineError::CardMismatch { play: play.id, card: card_id });
    }

    play.swipes.push(Swipe { card_id, direction, timestamp: now });
    play.last_activity = now;

    match direction {
        Direction::Left => Ok(advance(play, now)),
        Direction::Right => like(play, card_id, now),
    }
}

/// A liked card either lands in the ranking directly (first like, or a
/// position already pinned by votes) or opens a comparison.
fn like(play: &mut Play, card_id: CardId, now: DateTime<Utc>) -> Value<SwipeUpdate> {
    if play.personal_ranking.is_empty() {
        play.personal_ranking.push(card_id);
        debug!(?play.id, ?card_id, "First liked card ranked");
        return Ok(advance(play, now));
    }

    if let Some(proposal) = comparison::next_comparison(&play.personal_ranking, card_id, &play.votes)
    {
        play.phase = PlayPhase::Voting;
        play.current_pair =
            Some(CardPair { card_a: card_id, card_b: proposal.compare_with });
        debug!(
            ?play.id,
            ?card_id,
            compare_with = ?proposal.compare_with,
            "Comparison opened"
        );
        return Ok(SwipeUpdate {
            already_applied: false,
            next_card: None,
            requires_voting: true,
            current_pair: play.current_pair,
            completed: false,
            deck_exhausted: None,
        });
    }

    match insertion::insert_card(&play.personal_ranking, card_id, &play.votes) {
        Insertion::Inserted { ranking, index } => {
            play.personal_ranking = ranking;
            debug!(?play.id, ?card_id, index, "Card positioned without comparison");
        }
        Insertion::NeedsMoreComparisons => {
            let (ranking, index) =
                insertion::force_insert(&play.personal_ranking, card_id, &play.votes);
            warn!(?play.id, ?card_id, index, "No comparable candidate; inserting at lower bound");
            play.personal_ranking = ranking;
        }
    }
    Ok(advance(play, now))
}

fn advance(play: &mut Play, now: DateTime<Utc>) -> SwipeUpdate {
    if let Some(next) = play.next_unswiped() {
        return SwipeUpdate {
            already_applied: false,
            next_card: Some(next),
            requires_voting: false,
            current_pair: None,
            completed: false,
            deck_exhausted: None,
        };
    }
    let kind = splice::on_deck_exhausted(play, now);
    SwipeUpdate {
        already_applied: false,
        next_card: None,
        requires_voting: false,
        current_pair: None,
        completed: true,
        deck_exhausted: Some(kind),
    }
}
