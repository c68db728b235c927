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

//! Shared fixtures for the engine integration suites: card seeding and an
//! oracle-driven player that works regardless of the entropy-seeded deck
//! shuffle.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use data::cards::card::Card;
use data::core::config::EngineConfig;
use data::core::primitives::{CardId, HashTag, PlayId, SessionId, TenantId};
use data::plays::play::{CardPair, Play, PlayPhase, PlayStatus};
use data::plays::swipe::Direction;
use database::database::Database;
use database::memory_database::MemoryDatabase;
use server::server_data::{StartPlayRequest, SwipeRequest, VoteRequest};
use server::{new_play, play_action_server, requests};
use utils::clock::Clock;
use uuid::Uuid;

pub fn tenant() -> TenantId {
    TenantId(Uuid::from_u128(1))
}

pub fn session() -> SessionId {
    SessionId(Uuid::from_u128(2))
}

pub fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

/// Seeds one card per `(name, tags)` pair and returns name → id.
pub async fn seed_cards(
    database: &MemoryDatabase,
    cards: &[(&str, &[&str])],
) -> HashMap<String, CardId> {
    let mut ids = HashMap::new();
    for (name, tags) in cards {
        let card = Card {
            id: CardId(Uuid::new_v4()),
            tenant_id: tenant(),
            name: HashTag::new(name),
            body: serde_json::json!({ "title": name }),
            hashtags: tags.iter().map(HashTag::new).collect::<BTreeSet<_>>(),
            is_active: true,
        };
        ids.insert(name.to_string(), card.id);
        database.write_card(&card).await.unwrap();
    }
    ids
}

pub async fn start_play(
    database: &MemoryDatabase,
    config: &EngineConfig,
    clock: &Clock,
    deck_tag: &str,
) -> server::server_data::StartPlayResponse {
    new_play::create(
        database,
        config,
        clock,
        StartPlayRequest {
            tenant_id: tenant(),
            session_id: session(),
            deck_tag: deck_tag.to_string(),
        },
    )
    .await
    .unwrap()
}

fn oracle_winner(oracle: &[CardId], pair: CardPair) -> CardId {
    let rank = |card: CardId| {
        oracle.iter().position(|&c| c == card).expect("comparison card missing from oracle")
    };
    if rank(pair.card_a) < rank(pair.card_b) {
        pair.card_a
    } else {
        pair.card_b
    }
}

/// Plays `play_id` to the end of its own deck: likes every card in `likes`,
/// dislikes the rest, and answers comparisons according to `oracle` (earlier
/// is better).
pub async fn drive_play(
    database: &MemoryDatabase,
    config: &EngineConfig,
    clock: &Clock,
    play_id: PlayId,
    likes: &HashSet<CardId>,
    oracle: &[CardId],
) {
    loop {
        let play = requests::fetch_play(database, play_id).await.unwrap();
        match (play.status, play.phase) {
            (PlayStatus::Active, PlayPhase::Swiping) => {
                let card_id = play.next_unswiped().expect("active play with no next card");
                let direction =
                    if likes.contains(&card_id) { Direction::Right } else { Direction::Left };
                play_action_server::swipe(
                    database,
                    config,
                    clock,
                    SwipeRequest { play_id, card_id, direction, version: Some(play.version) },
                )
                .await
                .unwrap();
            }
            (PlayStatus::Active, PlayPhase::Voting) => {
                let pair = play.current_pair.expect("voting with no pending pair");
                play_action_server::vote(
                    database,
                    config,
                    clock,
                    VoteRequest {
                        play_id,
                        card_a: pair.card_a,
                        card_b: pair.card_b,
                        winner: oracle_winner(oracle, pair),
                        version: Some(play.version),
                    },
                )
                .await
                .unwrap();
            }
            _ => return,
        }
    }
}

/// Drives a root play and every child sub-session it forks until the root
/// finalizes.
pub async fn drive_hierarchical(
    database: &MemoryDatabase,
    config: &EngineConfig,
    clock: &Clock,
    root: PlayId,
    likes: &HashSet<CardId>,
    oracle: &[CardId],
) {
    drive_play(database, config, clock, root, likes, oracle).await;
    loop {
        let play = requests::fetch_play(database, root).await.unwrap();
        if play.status != PlayStatus::WaitingForChildren {
            return;
        }
        let child = play
            .hierarchical_state
            .as_ref()
            .and_then(|state| state.active)
            .expect("waiting for children with no active child")
            .play;
        drive_play(database, config, clock, child, likes, oracle).await;
    }
}

/// The structural invariants every play must satisfy at rest.
pub fn assert_play_invariants(play: &Play) {
    // Each card is swiped at most once.
    let mut seen = HashSet::new();
    for swipe in &play.swipes {
        assert!(seen.insert(swipe.card_id), "card {} swiped twice", swipe.card_id);
    }

    // The ranking is duplicate-free and contains only right-swiped cards.
    let liked: HashSet<CardId> = play
        .swipes
        .iter()
        .filter(|s| s.direction == Direction::Right)
        .map(|s| s.card_id)
        .collect();
    let mut ranked = HashSet::new();
    for card in &play.personal_ranking {
        assert!(ranked.insert(*card), "card {card} ranked twice");
        assert!(liked.contains(card), "ranked card {card} was never liked");
    }

    // Votes are well-formed and no unordered pair repeats.
    for (index, vote) in play.votes.iter().enumerate() {
        assert_ne!(vote.card_a, vote.card_b);
        assert!(vote.winner == vote.card_a || vote.winner == vote.card_b);
        for other in &play.votes[index + 1..] {
            assert!(
                !other.involves_pair(vote.card_a, vote.card_b),
                "pair voted twice: {} vs {}",
                vote.card_a,
                vote.card_b
            );
        }
    }

    // A pending pair exists exactly in the voting phase.
    assert_eq!(play.phase == PlayPhase::Voting, play.current_pair.is_some());

    // Completion timestamps track the completed status.
    assert_eq!(play.status == PlayStatus::Completed, play.completed_at.is_some());
}
