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
use data::core::primitives::PlayId;
use data::plays::hierarchy::HierarchicalPhase;
use data::plays::play::{deck_uuid, NewPlay, Play, PlayStatus};
use database::database::Database;
use rand::prelude::SliceRandom;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use rules::hierarchy::resolver;
use rules::hierarchy::splice::{self, HierarchyProgress};
use tracing::{debug, info, instrument, warn};
use utils::clock::Clock;
use uuid::Uuid;

use crate::new_play::hierarchy_allowed;
use crate::requests;

/// The public CompleteHierarchical operation: folds a finished child play's
/// ranking into its parent and resumes the parent's pending work.
///
/// The engine invokes this internally whenever a child play completes; it is
/// exposed for recovery tooling, e.g. when a child-spawn failure left the
/// parent in `waiting_for_children`.
#[instrument(level = "debug", skip(database, config, clock))]
pub async fn complete_child(
    database: &impl Database,
    config: &EngineConfig,
    clock: &Clock,
    play_id: PlayId,
) -> Value<()> {
    let play = requests::fetch_play(database, play_id).await?;
    if play.parent_play_id.is_none() {
        return Err(EngineError::NotChildPlay(play_id));
    }
    if play.status != PlayStatus::Completed {
        return Err(EngineError::WrongState { play: play_id, phase: play.phase });
    }
    advance(database, config, clock, play_id).await
}

/// Drives hierarchical bookkeeping from `play_id` upward.
///
/// A play waiting for children gets its next child sub-session spawned
/// (trivial child sets are recorded in place); a completed child play has
/// its ranking folded into the parent, whose own bookkeeping then continues.
/// The walk ends at a play that needs user input or has no parent.
pub(crate) async fn advance(
    database: &impl Database,
    config: &EngineConfig,
    clock: &Clock,
    play_id: PlayId,
) -> Value<()> {
    let mut cursor = play_id;
    loop {
        let play = requests::fetch_play(database, cursor).await?;
        match play.status {
            PlayStatus::WaitingForChildren => {
                match spawn_next_child(database, config, clock, play).await? {
                    Spawned::Child(_) => return Ok(()),
                    // Every remaining parent was trivial; the play completed
                    // and the loop re-reads it to propagate upward.
                    Spawned::Finalized => {}
                }
            }
            PlayStatus::Completed => {
                let Some(parent_id) = play.parent_play_id else {
                    return Ok(());
                };
                record_into_parent(database, clock, &play).await?;
                cursor = parent_id;
            }
            PlayStatus::Active | PlayStatus::Expired => return Ok(()),
        }
    }
}

enum Spawned {
    Child(PlayId),
    Finalized,
}

/// Starts the next pending child sub-session of `parent`.
///
/// Parents whose child set has shrunk below two by spawn time record the
/// trivial ranking and advance; if that exhausts the pending list the parent
/// finalizes without spawning anything. The child play is created before the
/// parent commits, so a conflict on the parent leaves at worst an orphaned
/// child that expires on its own.
async fn spawn_next_child(
    database: &impl Database,
    config: &EngineConfig,
    clock: &Clock,
    mut parent: Play,
) -> Value<Spawned> {
    let expected = parent.version;
    let now = clock.now();
    let cards = database.fetch_cards(parent.tenant_id).await?;

    loop {
        let Some(parent_card) = splice::next_pending_parent(&parent) else {
            return Err(EngineError::InvariantViolation {
                play: parent.id,
                detail: "waiting for children with nothing pending".into(),
            });
        };

        let children = resolver::resolve_children_of(&cards, parent_card);
        if children.len() < 2 {
            warn!(
                ?parent.id,
                ?parent_card,
                count = children.len(),
                "Child set shrank below two; recording trivial ranking"
            );
            match splice::record_child_result(&mut parent, parent_card, children, now)? {
                HierarchyProgress::NextParent(_) => continue,
                HierarchyProgress::Finalized => {
                    parent.version = expected + 1;
                    database.update_play(&parent, expected).await?;
                    return Ok(Spawned::Finalized);
                }
            }
        }

        let Some(parent_card_data) = cards.iter().find(|c| c.id == parent_card) else {
            return Err(EngineError::InvariantViolation {
                play: parent.id,
                detail: format!("parent card {parent_card} not found"),
            });
        };

        let mut rng = Xoshiro256StarStar::seed_from_u64(rand::random());
        let mut deck = children.clone();
        deck.shuffle(&mut rng);
        let depth = parent.depth + 1;
        let parent_eligible: Vec<_> = if hierarchy_allowed(config, depth) {
            children
                .iter()
                .copied()
                .filter(|&child| resolver::resolve_children_of(&cards, child).len() >= 2)
                .collect()
        } else {
            // Depth bound; also breaks cycles smuggled into the tag graph.
            debug!(?parent.id, depth, "Nesting cap reached; child play will not fork");
            vec![]
        };

        let child = Play::new(
            NewPlay::builder()
                .id(PlayId(Uuid::new_v4()))
                .tenant_id(parent.tenant_id)
                .session_id(parent.session_id)
                .deck_uuid(deck_uuid(&parent_card_data.name, &children))
                .deck_tag(parent_card_data.name.clone())
                .deck(deck)
                .parent_eligible(parent_eligible)
                .created_at(now)
                .ttl_seconds(config.play_ttl_seconds)
                .rng(rng)
                .parent_play_id(Some(parent.id))
                .depth(depth)
                .hierarchical_phase(HierarchicalPhase::Children)
                .build(),
        );
        database.create_play(&child).await?;

        splice::set_active_child(&mut parent, parent_card, child.id)?;
        parent.version = expected + 1;
        database.update_play(&parent, expected).await?;
        info!(
            ?parent.id,
            ?parent_card,
            child = ?child.id,
            cards = child.deck.len(),
            "Spawned child sub-session"
        );
        return Ok(Spawned::Child(child.id));
    }
}

/// Folds a completed child play's final ranking into its parent.
async fn record_into_parent(
    database: &impl Database,
    clock: &Clock,
    child: &Play,
) -> Value<HierarchyProgress> {
    let parent_id = child.parent_play_id.ok_or(EngineError::NotChildPlay(child.id))?;
    let mut parent = requests::fetch_play(database, parent_id).await?;
    let expected = parent.version;

    let active = parent.hierarchical_state.as_ref().and_then(|state| state.active);
    match active {
        Some(active) if active.play == child.id => {
            let progress = splice::record_child_result(
                &mut parent,
                active.parent_card,
                child.final_ranking().to_vec(),
                clock.now(),
            )?;
            parent.version = expected + 1;
            database.update_play(&parent, expected).await?;
            info!(?parent.id, child = ?child.id, ?progress, "Recorded child ranking");
            Ok(progress)
        }
        _ => Err(EngineError::NotChildPlay(child.id)),
    }
}
