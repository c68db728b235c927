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
use data::core::errors::{EngineError, Value};
use data::core::primitives::{HashTag, PlayId};
use data::plays::play::{deck_uuid, NewPlay, Play};
use database::database::Database;
use rand::prelude::SliceRandom;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use rules::hierarchy::resolver;
use tracing::{info, instrument};
use utils::clock::Clock;
use uuid::Uuid;

use crate::server_data::{StartPlayRequest, StartPlayResponse};

/// Resolves the deck, shuffles it, and creates a fresh play.
///
/// The shuffle order is drawn from an OS-entropy-seeded generator that is
/// persisted inside the play, so later draws (child shuffles, timeout
/// winners) replay identically after a restart.
#[instrument(level = "debug", skip(database, config, clock))]
pub async fn create(
    database: &impl Database,
    config: &EngineConfig,
    clock: &Clock,
    request: StartPlayRequest,
) -> Value<StartPlayResponse> {
    let deck_tag = HashTag::new(&request.deck_tag);
    let cards = database.fetch_cards(request.tenant_id).await?;
    if cards.is_empty() {
        return Err(EngineError::TenantUnknown(request.tenant_id));
    }

    let resolved = resolver::resolve_deck(&cards, &deck_tag);
    if resolved.card_ids.len() < 2 {
        return Err(EngineError::DeckTooSmall { deck_tag, count: resolved.card_ids.len() });
    }

    let mut rng = Xoshiro256StarStar::seed_from_u64(rand::random());
    let mut deck = resolved.card_ids.clone();
    deck.shuffle(&mut rng);

    let parent_eligible =
        if hierarchy_allowed(config, 0) { resolved.parent_eligible } else { vec![] };
    let is_hierarchical = !parent_eligible.is_empty();
    let total_cards = deck.len();
    let current_card = deck[0];

    let play = Play::new(
        NewPlay::builder()
            .id(PlayId(Uuid::new_v4()))
            .tenant_id(request.tenant_id)
            .session_id(request.session_id)
            .deck_uuid(deck_uuid(&deck_tag, &resolved.card_ids))
            .deck_tag(deck_tag)
            .deck(deck)
            .parent_eligible(parent_eligible)
            .created_at(clock.now())
            .ttl_seconds(config.play_ttl_seconds)
            .rng(rng)
            .build(),
    );
    database.create_play(&play).await?;
    info!(?play.id, ?request.tenant_id, total_cards, is_hierarchical, "Created new play");

    Ok(StartPlayResponse {
        play_id: play.id,
        current_card,
        total_cards,
        is_hierarchical,
        version: play.version,
    })
}

/// Whether a play at `depth` may fork child sub-sessions without exceeding
/// the configured nesting cap.
pub(crate) fn hierarchy_allowed(config: &EngineConfig, depth: u32) -> bool {
    depth + 1 < config.max_hierarchy_depth
}
