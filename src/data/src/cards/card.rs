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

use serde::{Deserialize, Serialize};

use crate::core::primitives::{CardId, HashTag, TenantId};

/// A card as the engine sees it.
///
/// Cards are created and edited externally; the engine consumes identifiers
/// and hierarchy metadata and treats everything else as opaque. A card `C`'s
/// children are the active cards whose `hashtags` contain `C`'s name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,

    pub tenant_id: TenantId,

    /// Hashtag-form name, unique per tenant.
    pub name: HashTag,

    /// Card content. Opaque to the engine.
    pub body: serde_json::Value,

    /// Tags this card carries, including the names of its parents.
    pub hashtags: BTreeSet<HashTag>,

    /// Soft-delete flag. Inactive cards never enter decks or child sets.
    pub is_active: bool,
}

impl Card {
    pub fn has_tag(&self, tag: &HashTag) -> bool {
        self.hashtags.contains(tag)
    }
}
