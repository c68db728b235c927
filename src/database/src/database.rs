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
use data::cards::card::Card;
use data::core::errors::Value;
use data::core::primitives::{CardId, PlayId, TenantId};
use data::plays::play::Play;
use data::rankings::global_ranking::GlobalRankingEntry;

/// Trait abstracting over ways of persisting engine state.
///
/// The encoding is implementation-defined, but append-only arrays inside a
/// play must round-trip in order, and `update_play` must implement the
/// optimistic-versioning contract: the write commits only when the stored
/// play still carries `expected_version`, and fails with
/// `ConcurrentModification` otherwise.
#[async_trait]
pub trait Database: Send + Sync {
    /// Every card of the tenant, active or not, in a stable order.
    async fn fetch_cards(&self, tenant_id: TenantId) -> Value<Vec<Card>>;

    /// Upserts a card. Card authoring lives outside the engine; this exists
    /// for operator tooling and tests.
    async fn write_card(&self, card: &Card) -> Value<()>;

    async fn fetch_play(&self, id: PlayId) -> Value<Option<Play>>;

    /// Writes a play that must not exist yet.
    async fn create_play(&self, play: &Play) -> Value<()>;

    /// Conditionally overwrites a play: commits only if the stored version
    /// equals `expected_version`, otherwise fails with
    /// `ConcurrentModification`.
    async fn update_play(&self, play: &Play, expected_version: u64) -> Value<()>;

    async fn delete_play(&self, id: PlayId) -> Value<()>;

    /// The most recently completed plays of the tenant that recorded at
    /// least one vote, newest first, at most `limit`.
    async fn completed_plays(&self, tenant_id: TenantId, limit: usize) -> Value<Vec<Play>>;

    /// Ids of plays whose TTL elapsed at or before `now`.
    async fn expired_plays(&self, now: DateTime<Utc>) -> Value<Vec<PlayId>>;

    async fn fetch_rankings(&self, tenant_id: TenantId) -> Value<Vec<GlobalRankingEntry>>;

    /// Bulk-upserts ranking entries keyed by `(tenant, card)`. All-or-
    /// nothing: a failure must not leave a partial write behind.
    async fn write_rankings(
        &self,
        tenant_id: TenantId,
        entries: &[GlobalRankingEntry],
    ) -> Value<()>;

    async fn fetch_ranking(
        &self,
        tenant_id: TenantId,
        card_id: CardId,
    ) -> Value<Option<GlobalRankingEntry>> {
        Ok(self
            .fetch_rankings(tenant_id)
            .await?
            .into_iter()
            .find(|entry| entry.card_id == card_id))
    }
}
