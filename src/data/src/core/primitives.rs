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

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tenant.
///
/// A tenant is an organization: the unit of isolation for cards, plays, and
/// global rankings. Nothing crosses tenant boundaries.
#[derive(
    Debug, Display, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct TenantId(pub Uuid);

/// Unique identifier for a card.
#[derive(
    Debug, Display, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct CardId(pub Uuid);

/// Unique identifier for a play: one user's run through a deck.
#[derive(
    Debug, Display, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct PlayId(pub Uuid);

/// Identifier of the browser session that created a play.
///
/// Carried for traceability only; the engine never branches on it.
#[derive(
    Debug, Display, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct SessionId(pub Uuid);

/// A hashtag-form string. Card names and deck tags are hashtags.
///
/// Normalized at construction: surrounding whitespace trimmed, lower-cased,
/// and a single leading `#` ensured, so lookups are insensitive to how the
/// tag was typed.
#[derive(Debug, Display, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct HashTag(String);

impl HashTag {
    pub fn new(tag: impl AsRef<str>) -> Self {
        let trimmed = tag.as_ref().trim().trim_start_matches('#').to_lowercase();
        Self(format!("#{trimmed}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
