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
use color_eyre::eyre::Context;
use data::cards::card::Card;
use data::core::errors::{EngineError, Value};
use data::core::primitives::{CardId, PlayId, TenantId};
use data::plays::play::{Play, PlayStatus};
use data::rankings::global_ranking::GlobalRankingEntry;
use serde_json::{de, ser};
use sled::{Batch, Db, Tree};

use crate::database::Database;

/// Document store over an embedded sled database.
///
/// Three trees: `cards` and `rankings` keyed by tenant id + card id (so a
/// tenant's rows are one prefix scan), `plays` keyed by play id alone.
pub struct SledDatabase {
    db: Db,
}

impl SledDatabase {
    pub fn new(path: impl Into<String>) -> Value<Self> {
        let db = sled::open(path.into()).context("Error opening the database")?;
        Ok(Self { db })
    }

    fn cards(&self) -> Value<Tree> {
        Ok(self.db.open_tree("cards").context("Error opening the 'cards' tree")?)
    }

    fn plays(&self) -> Value<Tree> {
        Ok(self.db.open_tree("plays").context("Error opening the 'plays' tree")?)
    }

    fn rankings(&self) -> Value<Tree> {
        Ok(self.db.open_tree("rankings").context("Error opening the 'rankings' tree")?)
    }

    fn all_plays(&self) -> Value<Vec<Play>> {
        let mut plays = vec![];
        for row in self.plays()?.iter() {
            let (_, bytes) = row.context("Error scanning the 'plays' tree")?;
            plays.push(decode_play(&bytes)?);
        }
        Ok(plays)
    }

    fn flush(&self) -> Value<()> {
        self.db.flush().context("Error flushing the database")?;
        Ok(())
    }
}

#[async_trait]
impl Database for SledDatabase {
    async fn fetch_cards(&self, tenant_id: TenantId) -> Value<Vec<Card>> {
        let mut cards = vec![];
        for row in self.cards()?.scan_prefix(tenant_id.0.as_u128().to_be_bytes()) {
            let (_, bytes) = row.context("Error scanning the 'cards' tree")?;
            cards.push(
                de::from_slice::<Card>(&bytes).context("Error deserializing a card")?,
            );
        }
        cards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cards)
    }

    async fn write_card(&self, card: &Card) -> Value<()> {
        self.cards()?
            .insert(
                tenant_card_key(card.tenant_id, card.id),
                ser::to_vec(card).with_context(|| format!("Error serializing card {}", card.id))?,
            )
            .with_context(|| format!("Error writing card {}", card.id))?;
        self.flush()
    }

    async fn fetch_play(&self, id: PlayId) -> Value<Option<Play>> {
        self.plays()?
            .get(play_key(id))
            .with_context(|| format!("Error fetching play {id}"))?
            .map(|bytes| decode_play(&bytes))
            .transpose()
    }

    async fn create_play(&self, play: &Play) -> Value<()> {
        let bytes = encode_play(play)?;
        let previous = self
            .plays()?
            .insert(play_key(play.id), bytes)
            .with_context(|| format!("Error writing play {}", play.id))?;
        if previous.is_some() {
            return Err(EngineError::InvariantViolation {
                play: play.id,
                detail: "created a play that already exists".into(),
            });
        }
        self.flush()
    }

    async fn update_play(&self, play: &Play, expected_version: u64) -> Value<()> {
        let tree = self.plays()?;
        let key = play_key(play.id);
        let current = tree
            .get(key)
            .with_context(|| format!("Error fetching play {}", play.id))?
            .ok_or(EngineError::PlayNotFound(play.id))?;
        if decode_play(&current)?.version != expected_version {
            return Err(EngineError::ConcurrentModification(play.id));
        }

        let swapped = tree
            .compare_and_swap(key, Some(current), Some(encode_play(play)?))
            .with_context(|| format!("Error writing play {}", play.id))?;
        if swapped.is_err() {
            return Err(EngineError::ConcurrentModification(play.id));
        }
        self.flush()
    }

    async fn delete_play(&self, id: PlayId) -> Value<()> {
        self.plays()?.remove(play_key(id)).with_context(|| format!("Error deleting play {id}"))?;
        self.flush()
    }

    async fn completed_plays(&self, tenant_id: TenantId, limit: usize) -> Value<Vec<Play>> {
        let mut plays: Vec<Play> = self
            .all_plays()?
            .into_iter()
            .filter(|play| {
                play.tenant_id == tenant_id
                    && play.status == PlayStatus::Completed
                    && !play.votes.is_empty()
            })
            .collect();
        plays.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id)));
        plays.truncate(limit);
        Ok(plays)
    }

    async fn expired_plays(&self, now: DateTime<Utc>) -> Value<Vec<PlayId>> {
        Ok(self
            .all_plays()?
            .into_iter()
            .filter(|play| play.is_expired(now))
            .map(|play| play.id)
            .collect())
    }

    async fn fetch_rankings(&self, tenant_id: TenantId) -> Value<Vec<GlobalRankingEntry>> {
        let mut entries = vec![];
        for row in self.rankings()?.scan_prefix(tenant_id.0.as_u128().to_be_bytes()) {
            let (_, bytes) = row.context("Error scanning the 'rankings' tree")?;
            entries.push(
                de::from_slice::<GlobalRankingEntry>(&bytes)
                    .context("Error deserializing a ranking entry")?,
            );
        }
        Ok(entries)
    }

    async fn write_rankings(
        &self,
        tenant_id: TenantId,
        entries: &[GlobalRankingEntry],
    ) -> Value<()> {
        let mut batch = Batch::default();
        for entry in entries {
            batch.insert(
                tenant_card_key(tenant_id, entry.card_id).to_vec(),
                ser::to_vec(entry)
                    .with_context(|| format!("Error serializing ranking for {}", entry.card_id))?,
            );
        }
        self.rankings()?.apply_batch(batch).context("Error writing rankings")?;
        self.flush()
    }
}

fn play_key(id: PlayId) -> [u8; 16] {
    id.0.as_u128().to_be_bytes()
}

fn tenant_card_key(tenant_id: TenantId, card_id: CardId) -> [u8; 32] {
    let mut key = [0; 32];
    key[..16].copy_from_slice(&tenant_id.0.as_u128().to_be_bytes());
    key[16..].copy_from_slice(&card_id.0.as_u128().to_be_bytes());
    key
}

fn encode_play(play: &Play) -> Value<Vec<u8>> {
    Ok(ser::to_vec(play).with_context(|| format!("Error serializing play {}", play.id))?)
}

fn decode_play(bytes: &[u8]) -> Value<Play> {
    Ok(de::from_slice::<Play>(bytes).context("Error deserializing a play")?)
}
