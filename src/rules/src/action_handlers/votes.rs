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
use data::core::errors::{EngineError, Value};
use data::core::primitives::CardId;
use data::plays::play::{CardPair, Play, PlayPhase};
use data::plays::vote::Vote;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::hierarchy::splice::{self, CompletionKind};
use crate::queries::play_queries;
use crate::ranking::comparison;
use crate::ranking::insertion::{self, Insertion};

/// What a vote did to the play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteUpdate {
    /// True when the identical vote was already recorded and nothing
    /// changed.
    pub already_applied: bool,

    /// True when the vote settled the card's position and swiping resumed.
    pub returned_to_swiping: bool,

    /// True when another comparison is required.
    pub requires_more_voting: bool,
    pub current_pair: Option<CardPair>,

    /// The card to present next, when swiping resumed.
    pub next_card: Option<CardId>,

    /// True when the play has left its swipe/vote loop.
    pub completed: bool,

    /// Set when this input exhausted the deck.
    pub deck_exhausted: Option<CompletionKind>,
}

impl VoteUpdate {
    fn snapshot(play: &Play) -> Self {
        Self {
            already_applied: true,
            returned_to_swiping: play.phase == PlayPhase::Swiping,
            requires_more_voting: play.phase == PlayPhase::Voting,
            current_pair: play.current_pair,
            next_card: match play.phase {
                PlayPhase::Swiping => play.next_unswiped(),
                _ => None,
            },
            completed: play.phase == PlayPhase::Completed,
            deck_exhausted: None,
        }
    }
}

/// Applies one vote to `play`.
///
/// An exact replay of a recorded vote — same cards, same winner — is
/// idempotent and returns the current state. A vote for an already-decided
/// pair with a different winner conflicts and is rejected.
pub fn execute(
    play: &mut Play,
    card_a: CardId,
    card_b: CardId,
    winner: CardId,
    client_version: Option<u64>,
    now: DateTime<Utc>,
) -> Value<VoteUpdate> {
    play_queries::ensure_not_expired(play, now)?;

    if play
        .votes
        .iter()
        .any(|v| v.card_a == card_a && v.card_b == card_b && v.winner == winner)
    {
        return Ok(VoteUpdate::snapshot(play));
    }

    play_queries::ensure_version(play, client_version)?;
    play_queries::ensure_accepts_input(play)?;
    if play.phase != PlayPhase::Voting {
        return Err(EngineError::WrongState { play: play.id, phase: play.phase });
    }
    let Some(pair) = play.current_pair else {
        return Err(EngineError::InvariantViolation {
            play: play.id,
            detail: "voting phase without a pending pair".into(),
        });
    };
    if !pair.matches(card_a, card_b) {
        return Err(EngineError::PairMismatch { play: play.id });
    }
    if winner != card_a && winner != card_b {
        return Err(EngineError::InvalidWinner { winner });
    }
    if play.votes.iter().any(|v| v.involves_pair(card_a, card_b)) {
        return Err(EngineError::DuplicateInput { play: play.id });
    }

    let positioned = play_queries::positioning_card(play, &pair)?;
    play.votes.push(Vote { card_a, card_b, winner, timestamp: now, timed_out: false });
    play.last_activity = now;
    resolve_positioning(play, positioned, now)
}

/// Resolves a comparison left unanswered past the configured timeout window
/// by drawing a uniformly random winner from the play's own generator.
///
/// Returns `Ok(None)` when the policy is disabled, no comparison is
/// pending, or the window has not elapsed.
pub fn apply_timeout(
    play: &mut Play,
    timeout_seconds: Option<i64>,
    now: DateTime<Utc>,
) -> Value<Option<VoteUpdate>> {
    let Some(seconds) = timeout_seconds else {
        return Ok(None);
    };
    if play.phase != PlayPhase::Voting {
        return Ok(None);
    }
    play_queries::ensure_not_expired(play, now)?;
    let Some(pair) = play.current_pair else {
        return Ok(None);
    };
    if now.signed_duration_since(play.last_activity) < Duration::seconds(seconds) {
        return Ok(None);
    }

    let winner = if play.rng.gen_bool(0.5) { pair.card_a } else { pair.card_b };
    let positioned = play_queries::positioning_card(play, &pair)?;
    play.votes.push(Vote {
        card_a: pair.card_a,
        card_b: pair.card_b,
        winner,
        timestamp: now,
        timed_out: true,
    });
    play.last_activity = now;
    info!(?play.id, ?winner, "Comparison resolved by timeout");
    resolve_positioning(play, positioned, now).map(Some)
}

/// With the latest vote recorded, either the card's position collapses and
/// swiping resumes, or the next comparison is proposed.
fn resolve_positioning(play: &mut Play, card: CardId, now: DateTime<Utc>) -> Value<VoteUpdate> {
    match insertion::insert_card(&play.personal_ranking, card, &play.votes) {
        Insertion::Inserted { ranking, index } => {
            play.personal_ranking = ranking;
            debug!(?play.id, ?card, index, "Card positioned");
            Ok(return_to_swiping(play, now))
        }
        Insertion::NeedsMoreComparisons => {
            match comparison::next_comparison(&play.personal_ranking, card, &play.votes) {
                Some(proposal) => {
                    play.current_pair =
                        Some(CardPair { card_a: card, card_b: proposal.compare_with });
                    debug!(
                        ?play.id,
                        ?card,
                        compare_with = ?proposal.compare_with,
                        "Next comparison"
                    );
                    Ok(VoteUpdate {
                        already_applied: false,
                        returned_to_swiping: false,
                        requires_more_voting: true,
                        current_pair: play.current_pair,
                        next_card: None,
                        completed: false,
                        deck_exhausted: None,
                    })
                }
                None => {
                    let (ranking, index) =
                        insertion::force_insert(&play.personal_ranking, card, &play.votes);
                    warn!(
                        ?play.id,
                        ?card,
                        index,
                        "No comparable candidate; inserting at lower bound"
                    );
                    play.personal_ranking = ranking;
                    Ok(return_to_swiping(play, now))
                }
            }
        }
    }
}

fn return_to_swiping(play: &mut Play, now: DateTime<Utc>) -> VoteUpdate {
    play.current_pair = None;
    play.phase = PlayPhase::Swiping;
    if let Some(next) = play.next_unswiped() {
        return VoteUpdate {
            already_applied: false,
            returned_to_swiping: true,
            requires_more_voting: false,
            current_pair: None,
            next_card: Some(next),
            completed: false,
            deck_exhausted: None,
        };
    }
    let kind = splice::on_deck_exhausted(play, now);
    VoteUpdate {
        already_applied: false,
        returned_to_swiping: true,
        requires_more_voting: false,
        current_pair: None,
        next_card: None,
        completed: true,
        deck_exhausted: Some(kind),
    }
}
