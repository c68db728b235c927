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

use thiserror::Error;

use crate::core::primitives::{CardId, HashTag, PlayId, TenantId};
use crate::plays::play::PlayPhase;

/// Result alias used throughout the engine.
pub type Value<T> = Result<T, EngineError>;

/// Every failure the engine surfaces to a caller.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The deck tag resolves to fewer than two playable cards.
    #[error("deck {deck_tag} resolves to {count} cards, need at least 2")]
    DeckTooSmall { deck_tag: HashTag, count: usize },

    /// The tenant has no cards at all.
    #[error("tenant {0} has no cards")]
    TenantUnknown(TenantId),

    #[error("play {0} not found")]
    PlayNotFound(PlayId),

    /// The play's TTL has elapsed; a fresh play must be created.
    #[error("play {0} has expired")]
    Expired(PlayId),

    /// The operation is not valid for the play's current phase or status.
    #[error("play {play} cannot accept this input in phase {phase:?}")]
    WrongState { play: PlayId, phase: PlayPhase },

    /// The swiped card is not the play's next unswiped card.
    #[error("card {card} is not the next card of play {play}")]
    CardMismatch { play: PlayId, card: CardId },

    /// The voted pair does not match the pending comparison.
    #[error("vote pair does not match the pending comparison of play {play}")]
    PairMismatch { play: PlayId },

    #[error("winner {winner} is not a member of the voted pair")]
    InvalidWinner { winner: CardId },

    /// The input names a card or pair that already has a recorded decision
    /// with a different outcome. Retrying the identical payload is a no-op;
    /// this variant means the payload conflicts.
    #[error("input conflicts with a decision already recorded for play {play}")]
    DuplicateInput { play: PlayId },

    /// Another mutation won the optimistic-versioning race. Re-read the
    /// play and retry.
    #[error("play {0} was modified concurrently")]
    ConcurrentModification(PlayId),

    #[error("play {0} is not a child play")]
    NotChildPlay(PlayId),

    /// A global-ranking recompute is already in flight for this tenant.
    #[error("global ranking recompute already running for tenant {0}")]
    AlreadyRunning(TenantId),

    /// Engine state contradicts an invariant. Logged with the play and
    /// surfaced generically.
    #[error("invariant violated in play {play}: {detail}")]
    InvariantViolation { play: PlayId, detail: String },

    #[error(transparent)]
    Internal(#[from] color_eyre::Report),
}

/// Coarse classification of an [EngineError], driving retry and surfacing
/// policy at the transport edge.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorCategory {
    /// Well-formed but semantically invalid request. Never retry.
    ClientValidation,
    /// Lost an optimistic-versioning race. Retry after re-reading.
    Conflict,
    /// The referenced play does not exist.
    NotFound,
    /// The play can no longer accept input; start a new one.
    Expired,
    /// Persistence or invariant failure. Surface generically.
    Internal,
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::DeckTooSmall { .. }
            | EngineError::TenantUnknown(_)
            | EngineError::WrongState { .. }
            | EngineError::CardMismatch { .. }
            | EngineError::PairMismatch { .. }
            | EngineError::InvalidWinner { .. }
            | EngineError::DuplicateInput { .. }
            | EngineError::NotChildPlay(_)
            | EngineError::AlreadyRunning(_) => ErrorCategory::ClientValidation,
            EngineError::ConcurrentModification(_) => ErrorCategory::Conflict,
            EngineError::PlayNotFound(_) => ErrorCategory::NotFound,
            EngineError::Expired(_) => ErrorCategory::Expired,
            EngineError::InvariantViolation { .. } | EngineError::Internal(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// True when the caller may safely retry the identical request after
    /// re-reading the play.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Conflict
    }
}
