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

mod support;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use data::cards::card::Card;
use data::core::config::EngineConfig;
use data::core::errors::{EngineError, Value};
use data::core::primitives::{CardId, HashTag, PlayId, TenantId};
use data::plays::play::{deck_uuid, NewPlay, Play, PlayStatus};
use data::plays::vote::Vote;
use data::rankings::global_ranking::GlobalRankingEntry;
use database::database::Database;
use database::memory_database::MemoryDatabase;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use server::global_ranking_server::{self, RecomputeGuard};
use support::*;
use tokio::sync::Notify;
use uuid::Uuid;

fn at(offset: i64) -> DateTime<Utc> {
    fixed_now() + chrono::Duration::seconds(offset)
}

fn vote_at(a: CardId, b: CardId, winner: CardId, offset: i64) -> Vote {
    Vote { card_a: a, card_b: b, winner, timestamp: at(offset), timed_out: false }
}

/// A completed play holding pre-recorded votes, for seeding the aggregator.
fn completed_play(id: u128, deck: Vec<CardId>, votes: Vec<Vote>, completed_offset: i64) -> Play {
    let tag = HashTag::new("#animals");
    let mut play = Play::new(
        NewPlay::builder()
            .id(PlayId(Uuid::from_u128(id)))
            .tenant_id(tenant())
            .session_id(session())
            .deck_uuid(deck_uuid(&tag, &deck))
            .deck_tag(tag)
            .deck(deck)
            .parent_eligible(vec![])
            .created_at(at(0))
            .ttl_seconds(86_400)
            .rng(Xoshiro256StarStar::seed_from_u64(id as u64))
            .build(),
    );
    play.status = PlayStatus::Completed;
    play.completed_at = Some(at(completed_offset));
    play.votes = votes;
    play
}

async fn seed_three_cards(database: &MemoryDatabase) -> (CardId, CardId, CardId) {
    let ids = seed_cards(
        database,
        &[("#ant", &["#animals"]), ("#bee", &["#animals"]), ("#cat", &["#animals"])],
    )
    .await;
    (ids["#ant"], ids["#bee"], ids["#cat"])
}

#[tokio::test]
async fn recompute_replays_votes_into_the_leaderboard() {
    let database = MemoryDatabase::new();
    let (a, b, c) = seed_three_cards(&database).await;
    let config = EngineConfig::default();
    let clock = fixed_clock();
    let guard = RecomputeGuard::new();

    database
        .create_play(&completed_play(
            10,
            vec![a, b, c],
            vec![vote_at(a, b, a, 0), vote_at(a, c, c, 1)],
            10,
        ))
        .await
        .unwrap();
    database
        .create_play(&completed_play(11, vec![a, b, c], vec![vote_at(b, c, b, 2)], 11))
        .await
        .unwrap();

    let summary =
        global_ranking_server::recompute(&database, &config, &clock, &guard, tenant())
            .await
            .unwrap();
    assert_eq!(summary.plays_scanned, 2);
    assert_eq!(summary.votes_applied, 3);
    assert_eq!(summary.votes_dropped, 0);
    assert_eq!(summary.cards_updated, 3);

    let board = global_ranking_server::leaderboard(&database, tenant()).await.unwrap();
    assert_eq!(board.len(), 3);
    // Replay: (A,B,A) -> 1016/984; (A,C,C) -> A 999, C 1017;
    // (B,C,B) -> B 1002, C 999.
    let rating =
        |card: CardId| board.iter().find(|e| e.card_id == card).unwrap().elo_rating;
    assert_eq!(rating(a), 999);
    assert_eq!(rating(b), 1002);
    assert_eq!(rating(c), 999);
    assert_eq!(board[0].card_id, b);
    // A and C tie on rating, win rate, games and recency; the card id
    // breaks the tie deterministically.
    let tied: Vec<CardId> = board[1..].iter().map(|e| e.card_id).collect();
    assert_eq!(tied, if a < c { vec![a, c] } else { vec![c, a] });
}

#[tokio::test]
async fn identical_inputs_recompute_to_identical_tables() {
    let config = EngineConfig::default();
    let clock = fixed_clock();

    let mut tables = vec![];
    for _ in 0..2 {
        let database = MemoryDatabase::new();
        let (a, b, c) = seed_three_cards(&database).await;
        database
            .create_play(&completed_play(
                10,
                vec![a, b, c],
                vec![vote_at(a, b, b, 0), vote_at(b, c, c, 1), vote_at(a, c, a, 2)],
                10,
            ))
            .await
            .unwrap();
        let guard = RecomputeGuard::new();
        global_ranking_server::recompute(&database, &config, &clock, &guard, tenant())
            .await
            .unwrap();
        let board = global_ranking_server::leaderboard(&database, tenant()).await.unwrap();
        // Identify cards by name-independent position: map ids to ratings
        // sorted by card id for comparison across databases.
        let mut flat: Vec<(i32, u32, u32)> =
            board.iter().map(|e| (e.elo_rating, e.wins, e.losses)).collect();
        flat.sort();
        tables.push(flat);
    }
    assert_eq!(tables[0], tables[1]);
}

#[tokio::test]
async fn the_window_bounds_how_many_plays_replay() {
    let database = MemoryDatabase::new();
    let (a, b, _) = seed_three_cards(&database).await;
    let config = EngineConfig { elo_window: 2, ..EngineConfig::default() };
    let clock = fixed_clock();
    let guard = RecomputeGuard::new();

    for n in 0..4u128 {
        database
            .create_play(&completed_play(
                10 + n,
                vec![a, b],
                vec![vote_at(a, b, a, n as i64)],
                n as i64,
            ))
            .await
            .unwrap();
    }

    let summary =
        global_ranking_server::recompute(&database, &config, &clock, &guard, tenant())
            .await
            .unwrap();
    assert_eq!(summary.plays_scanned, 2);
    assert_eq!(summary.votes_applied, 2);
}

#[tokio::test]
async fn malformed_votes_are_dropped_and_counted() {
    let database = MemoryDatabase::new();
    let (a, b, _) = seed_three_cards(&database).await;
    let ghost = CardId(Uuid::from_u128(999));
    let config = EngineConfig::default();
    let clock = fixed_clock();
    let guard = RecomputeGuard::new();

    database
        .create_play(&completed_play(
            10,
            vec![a, b],
            vec![vote_at(a, a, a, 0), vote_at(a, ghost, a, 1), vote_at(a, b, a, 2)],
            10,
        ))
        .await
        .unwrap();

    let summary =
        global_ranking_server::recompute(&database, &config, &clock, &guard, tenant())
            .await
            .unwrap();
    assert_eq!(summary.votes_dropped, 2);
    assert_eq!(summary.votes_applied, 1);

    let board = global_ranking_server::leaderboard(&database, tenant()).await.unwrap();
    assert!(board.iter().all(|entry| entry.card_id != ghost));
}

#[tokio::test]
async fn plays_without_votes_never_enter_a_run() {
    let database = MemoryDatabase::new();
    let (a, b, _) = seed_three_cards(&database).await;
    let config = EngineConfig::default();
    let clock = fixed_clock();
    let guard = RecomputeGuard::new();

    database.create_play(&completed_play(10, vec![a, b], vec![], 10)).await.unwrap();

    let summary =
        global_ranking_server::recompute(&database, &config, &clock, &guard, tenant())
            .await
            .unwrap();
    assert_eq!(summary.plays_scanned, 0);
    assert!(global_ranking_server::leaderboard(&database, tenant()).await.unwrap().is_empty());
}

/// Wraps a database so the test can hold a recompute inside its play scan
/// while a second recompute is attempted.
struct StalledDatabase {
    inner: MemoryDatabase,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Database for StalledDatabase {
    async fn fetch_cards(&self, tenant_id: TenantId) -> Value<Vec<Card>> {
        self.inner.fetch_cards(tenant_id).await
    }

    async fn write_card(&self, card: &Card) -> Value<()> {
        self.inner.write_card(card).await
    }

    async fn fetch_play(&self, id: PlayId) -> Value<Option<Play>> {
        self.inner.fetch_play(id).await
    }

    async fn create_play(&self, play: &Play) -> Value<()> {
        self.inner.create_play(play).await
    }

    async fn update_play(&self, play: &Play, expected_version: u64) -> Value<()> {
        self.inner.update_play(play, expected_version).await
    }

    async fn delete_play(&self, id: PlayId) -> Value<()> {
        self.inner.delete_play(id).await
    }

    async fn completed_plays(&self, tenant_id: TenantId, limit: usize) -> Value<Vec<Play>> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.completed_plays(tenant_id, limit).await
    }

    async fn expired_plays(&self, now: DateTime<Utc>) -> Value<Vec<PlayId>> {
        self.inner.expired_plays(now).await
    }

    async fn fetch_rankings(&self, tenant_id: TenantId) -> Value<Vec<GlobalRankingEntry>> {
        self.inner.fetch_rankings(tenant_id).await
    }

    async fn write_rankings(
        &self,
        tenant_id: TenantId,
        entries: &[GlobalRankingEntry],
    ) -> Value<()> {
        self.inner.write_rankings(tenant_id, entries).await
    }
}

#[tokio::test]
async fn overlapping_recomputes_on_one_tenant_are_refused() {
    let database = Arc::new(StalledDatabase {
        inner: MemoryDatabase::new(),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let config = EngineConfig::default();
    let guard = Arc::new(RecomputeGuard::new());

    let first = {
        let database = Arc::clone(&database);
        let guard = Arc::clone(&guard);
        let config = config.clone();
        tokio::spawn(async move {
            global_ranking_server::recompute(
                database.as_ref(),
                &config,
                &fixed_clock(),
                &guard,
                tenant(),
            )
            .await
        })
    };

    // Wait until the first run holds the tenant guard inside its scan.
    database.entered.notified().await;

    let err = global_ranking_server::recompute(
        database.as_ref(),
        &config,
        &fixed_clock(),
        &guard,
        tenant(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyRunning(_)));

    database.release.notify_one();
    first.await.unwrap().unwrap();

    // Once the first run finished, the tenant is free again. Pre-arm the
    // release so the scan passes straight through.
    database.release.notify_one();
    global_ranking_server::recompute(database.as_ref(), &config, &fixed_clock(), &guard, tenant())
        .await
        .unwrap();
}
