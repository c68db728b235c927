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
use data::plays::play::{CardPair, Play, PlayStatus};

/// Rejects input once the play's TTL has elapsed.
pub fn ensure_not_expired(play: &Play, now: DateTime<Utc>) -> Value<()> {
    if play.is_expired(now) {
        return Err(EngineError::Expired(play.id));
    }
    Ok(())
}

/// Rejects input carrying a stale client version.
///
/// Omitting the version skips the check; the conditional write still
/// guards the commit.
pub fn ensure_version(play: &Play, client_version: Option<u64>) -> Value<()> {
    match client_version {
        Some(version) if version != play.version => {
            Err(EngineError::ConcurrentModification(play.id))
        }
        _ => Ok(()),
    }
}

/// Rejects input on plays that are no longer accepting it.
pub fn ensure_accepts_input(play: &Play) -> Value<()> {
    match play.status {
        PlayStatus::Active | PlayStatus::WaitingForChildren => Ok(()),
        PlayStatus::Completed | PlayStatus::Expired => {
            Err(EngineError::WrongState { play: play.id, phase: play.phase })
        }
    }
}

/// The card a pending pair is positioning: the member not yet in the
/// personal ranking.
pub fn positioning_card(play: &Play, pair: &CardPair) -> Value<CardId> {
    match (play.is_ranked(pair.card_a), play.is_ranked(pair.card_b)) {
        (false, true) => Ok(pair.card_a),
        (true, false) => Ok(pair.card_b),
        (ranked_a, _) => Err(EngineError::InvariantViolation {
            play: play.id,
            detail: if ranked_a {
                "both cards of the pending pair are already ranked".into()
            } else {
                "neither card of the pending pair is ranked".into()
            },
        }),
    }
}
