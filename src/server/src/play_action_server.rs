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

use data::core::config::EngineConfig;
use data::core::errors::Value;
use data::core::primitives::PlayId;
use database::database::Database;
use rules::action_handlers::{swipes, votes};
use tracing::instrument;
use utils::clock::Clock;

use crate::hierarchy_server;
use crate::requests;
use crate::server_data::{SwipeRequest, SwipeResponse, VoteRequest, VoteResponse};

/// Applies one swipe and commits it with a conditional write.
///
/// Idempotent replays return the current state without a write, so the
/// version advances only for inputs that changed the play.
#[instrument(level = "debug", skip(database, config, clock))]
pub async fn swipe(
    database: &impl Database,
    config: &EngineConfig,
    clock: &Clock,
    request: SwipeRequest,
) -> Value<SwipeResponse> {
    let mut play = requests::fetch_play(database, request.play_id).await?;
    let expected = play.version;

    let update = swipes::execute(
        &mut play,
        request.card_id,
        request.direction,
        request.version,
        clock.now(),
    )?;
    if update.already_applied {
        return Ok(SwipeResponse::from_play(&play, true));
    }

    play.version = expected + 1;
    database.update_play(&play, expected).await?;

    if update.deck_exhausted.is_some() {
        hierarchy_server::advance(database, config, clock, play.id).await?;
        play = requests::fetch_play(database, play.id).await?;
    }
    Ok(SwipeResponse::from_play(&play, false))
}

/// Applies one vote and commits it with a conditional write.
#[instrument(level = "debug", skip(database, config, clock))]
pub async fn vote(
    database: &impl Database,
    config: &EngineConfig,
    clock: &Clock,
    request: VoteRequest,
) -> Value<VoteResponse> {
    let mut play = requests::fetch_play(database, request.play_id).await?;
    let expected = play.version;

    let update = votes::execute(
        &mut play,
        request.card_a,
        request.card_b,
        request.winner,
        request.version,
        clock.now(),
    )?;
    if update.already_applied {
        return Ok(VoteResponse::from_play(&play, true));
    }

    play.version = expected + 1;
    database.update_play(&play, expected).await?;

    if update.deck_exhausted.is_some() {
        hierarchy_server::advance(database, config, clock, play.id).await?;
        play = requests::fetch_play(database, play.id).await?;
    }
    Ok(VoteResponse::from_play(&play, false))
}

/// Applies the optional vote-timeout policy to a play.
///
/// Returns `Ok(None)` when the policy is disabled or nothing is due; the
/// play is untouched in that case.
#[instrument(level = "debug", skip(database, config, clock))]
pub async fn resolve_vote_timeout(
    database: &impl Database,
    config: &EngineConfig,
    clock: &Clock,
    play_id: PlayId,
) -> Value<Option<VoteResponse>> {
    let mut play = requests::fetch_play(database, play_id).await?;
    let expected = play.version;

    let Some(update) = votes::apply_timeout(&mut play, config.vote_timeout_seconds, clock.now())?
    else {
        return Ok(None);
    };

    play.version = expected + 1;
    database.update_play(&play, expected).await?;

    if update.deck_exhausted.is_some() {
        hierarchy_server::advance(database, config, clock, play.id).await?;
        play = requests::fetch_play(database, play.id).await?;
    }
    Ok(Some(VoteResponse::from_play(&play, false)))
}
