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

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use data::cards::card::Card;
use data::core::errors::EngineError;
use data::core::primitives::{CardId, HashTag, PlayId, SessionId, TenantId};
use data::plays::play::{deck_uuid, NewPlay, Play, PlayStatus};
use data::plays::vote::Vote;
use data::rankings::global_ranking::GlobalRankingEntry;
use database::database::Database;
use database::sled_database::SledDatabase;
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use uuid::Uuid;

fn open_scratch_database() -> SledDatabase {
    let path = std::env::temp_dir().join(format!("narimato-test-{}", Uuid::new_v4()));
    SledDatabase::new(path.to_string_lossy().into_owned()).unwrap()
}

fn tenant() -> TenantId {
    TenantId(Uuid::from_u128(7))
}

fn card_id(n: u128) -> CardId {
    CardId(Uuid::from_u128(n))
}

fn at(offset: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + offset, 0).unwrap()
}

fn sample_play(id: u128) -> Play {
    let tag = HashTag::new("#deck");
    let deck = vec![card_id(1), card_id(2)];
    Play::new(
        NewPlay::builder()
            .id(PlayId(Uuid::from_u128(id)))
            .tenant_id(tenant())
            .session_id(SessionId(Uuid::from_u128(8)))
            .deck_uuid(deck_uuid(&tag, &deck))
            .deck_tag(tag)
            .deck(deck)
            .parent_eligible(vec![])
            .created_at(at(0))
            .ttl_seconds(86_400)
            .rng(Xoshiro256StarStar::seed_from_u64(2))
            .build(),
    )
}

fn sample_card(n: u128, name: &str) -> Card {
    Card {
        id: card_id(n),
        tenant_id: tenant(),
        name: HashTag::new(name),
        body: serde_json::json!({"title": name}),
        hashtags: [HashTag::new("#deck")].into_iter().collect::<BTreeSet<_>>(),
        is_active: true,
    }
}

#[tokio::test]
async fn plays_round_trip_with_their_append_only_arrays() {
    let database = open_scratch_database();
    let mut play = sample_play(1);
    play.votes.push(Vote {
        card_a: card_id(2),
        card_b: card_id(1),
        winner: card_id(1),
        timestamp: at(5),
        timed_out: false,
    });
    play.personal_ranking = vec![card_id(1), card_id(2)];
    database.create_play(&play).await.unwrap();

    let loaded = database.fetch_play(play.id).await.unwrap().unwrap();
    assert_eq!(loaded.personal_ranking, play.personal_ranking);
    assert_eq!(loaded.votes, play.votes);
    assert_eq!(loaded.deck, play.deck);
    assert_eq!(loaded.expires_at, play.expires_at);
}

#[tokio::test]
async fn conditional_updates_reject_stale_versions() {
    let database = open_scratch_database();
    let mut play = sample_play(1);
    database.create_play(&play).await.unwrap();

    play.version = 1;
    database.update_play(&play, 0).await.unwrap();

    let mut stale = sample_play(1);
    stale.version = 1;
    let err = database.update_play(&stale, 0).await.unwrap_err();
    assert!(matches!(err, EngineError::ConcurrentModification(_)));

    // The committed write survived.
    assert_eq!(database.fetch_play(play.id).await.unwrap().unwrap().version, 1);
}

#[tokio::test]
async fn completed_plays_filters_sorts_and_bounds() {
    let database = open_scratch_database();
    for n in 1..=4u128 {
        let mut play = sample_play(n);
        if n < 4 {
            play.status = PlayStatus::Completed;
            play.completed_at = Some(at(n as i64));
            play.votes.push(Vote {
                card_a: card_id(1),
                card_b: card_id(2),
                winner: card_id(1),
                timestamp: at(0),
                timed_out: false,
            });
        }
        database.create_play(&play).await.unwrap();
    }
    // A completed play without votes never enters the window.
    let mut voteless = sample_play(9);
    voteless.status = PlayStatus::Completed;
    voteless.completed_at = Some(at(50));
    database.create_play(&voteless).await.unwrap();

    let window = database.completed_plays(tenant(), 2).await.unwrap();
    let ids: Vec<PlayId> = window.iter().map(|p| p.id).collect();
    // Newest first, bounded to two.
    assert_eq!(ids, vec![PlayId(Uuid::from_u128(3)), PlayId(Uuid::from_u128(2))]);
}

#[tokio::test]
async fn expired_plays_are_found_and_deletable() {
    let database = open_scratch_database();
    let play = sample_play(1);
    database.create_play(&play).await.unwrap();

    assert!(database.expired_plays(at(0)).await.unwrap().is_empty());
    let expired = database.expired_plays(play.expires_at + Duration::seconds(1)).await.unwrap();
    assert_eq!(expired, vec![play.id]);

    database.delete_play(play.id).await.unwrap();
    assert!(database.fetch_play(play.id).await.unwrap().is_none());
}

#[tokio::test]
async fn cards_scan_by_tenant_in_name_order() {
    let database = open_scratch_database();
    database.write_card(&sample_card(2, "#zebra")).await.unwrap();
    database.write_card(&sample_card(1, "#aardvark")).await.unwrap();

    let mut other = sample_card(3, "#other");
    other.tenant_id = TenantId(Uuid::from_u128(99));
    database.write_card(&other).await.unwrap();

    let cards = database.fetch_cards(tenant()).await.unwrap();
    let names: Vec<&str> = cards.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["#aardvark", "#zebra"]);
}

#[tokio::test]
async fn rankings_bulk_upsert_and_read_back() {
    let database = open_scratch_database();
    let entries = vec![
        GlobalRankingEntry::seed(tenant(), card_id(1), at(0)),
        GlobalRankingEntry {
            elo_rating: 1016,
            ..GlobalRankingEntry::seed(tenant(), card_id(2), at(0))
        },
    ];
    database.write_rankings(tenant(), &entries).await.unwrap();

    let loaded = database.fetch_rankings(tenant()).await.unwrap();
    assert_eq!(loaded.len(), 2);
    let ratings: Vec<i32> = loaded.iter().map(|e| e.elo_rating).collect();
    assert!(ratings.contains(&1000) && ratings.contains(&1016));

    // Upserting overwrites in place.
    let update = vec![GlobalRankingEntry {
        elo_rating: 984,
        ..GlobalRankingEntry::seed(tenant(), card_id(1), at(10))
    }];
    database.write_rankings(tenant(), &update).await.unwrap();
    let reread = database.fetch_ranking(tenant(), card_id(1)).await.unwrap().unwrap();
    assert_eq!(reread.elo_rating, 984);
}
