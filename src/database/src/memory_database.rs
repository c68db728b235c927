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

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use data::cards::card::Card;
use data::core::errors::{EngineError, Value};
use data::core::primitives::{CardId, PlayId, TenantId};
use data::plays::play::{Play, PlayStatus};
use data::rankings::global_ranking::GlobalRankingEntry;

use crate::database::Database;

/// In-process implementation of [Database] over concurrent maps.
///
/// Used by the test suites and by embedders that do not need durability.
/// The optimistic-versioning contract is upheld: `update_play` checks the
/// stored version under the map's shard lock.
#[derive(Default)]
pub struct MemoryDatabase {
    cards: DashMap<(TenantId, CardId), Card>,
    plays: DashMap<PlayId, Play>,
    rankings: DashMap<(TenantId, CardId), GlobalRankingEntry>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn fetch_cards(&self, tenant_id: TenantId) -> Value<Vec<Card>> {
        let mut cards: Vec<Card> = self
            .cards
            .iter()
            .filter(|entry| entry.key().0 == tenant_id)
            .map(|entry| entry.value().clone())
            .collect();
        cards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cards)
    }

    async fn write_card(&self, card: &Card) -> Value<()> {
        self.cards.insert((card.tenant_id, card.id), card.clone());
        Ok(())
    }

    async fn fetch_play(&self, id: PlayId) -> Value<Option<Play>> {
        Ok(self.plays.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create_play(&self, play: &Play) -> Value<()> {
        if self.plays.contains_key(&play.id) {
            return Err(EngineError::InvariantViolation {
                play: play.id,
                detail: "created a play that already exists".into(),
            });
        }
        self.plays.insert(play.id, play.clone());
        Ok(())
    }

    async fn update_play(&self, play: &Play, expected_version: u64) -> Value<()> {
        let Some(mut entry) = self.plays.get_mut(&play.id) else {
            return Err(EngineError::PlayNotFound(play.id));
        };
        if entry.version != expected_version {
            return Err(EngineError::ConcurrentModification(play.id));
        }
        *entry = play.clone();
        Ok(())
    }

    async fn delete_play(&self, id: PlayId) -> Value<()> {
        self.plays.remove(&id);
        Ok(())
    }

    async fn completed_plays(&self, tenant_id: TenantId, limit: usize) -> Value<Vec<Play>> {
        let mut plays: Vec<Play> = self
            .plays
            .iter()
            .filter(|entry| {
                let play = entry.value();
                play.tenant_id == tenant_id
                    && play.status == PlayStatus::Completed
                    && !play.votes.is_empty()
            })
            .map(|entry| entry.value().clone())
            .collect();
        plays.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id)));
        plays.truncate(limit);
        Ok(plays)
    }

    async fn expired_plays(&self, now: DateTime<Utc>) -> Value<Vec<PlayId>> {
        Ok(self
            .plays
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| *entry.key())
            .collect())
    }

    async fn fetch_rankings(&self, tenant_id: TenantId) -> Value<Vec<GlobalRankingEntry>> {
        let mut entries: Vec<GlobalRankingEntry> = self
            .rankings
            .iter()
            .filter(|entry| entry.key().0 == tenant_id)
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by(|a, b| a.card_id.cmp(&b.card_id));
        Ok(entries)
    }

    async fn write_rankings(
        &self,
        tenant_id: TenantId,
        entries: &[GlobalRankingEntry],
    ) -> Value<()> {
        for entry in entries {
            self.rankings.insert((tenant_id, entry.card_id), entry.clone());
        }
        Ok(())
    }
}
