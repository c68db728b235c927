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

use data::cards::card::Card;
use data::core::primitives::{CardId, HashTag};

/// A deck resolved from a tenant's card snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDeck {
    /// Active cards tagged with the deck tag, in snapshot order.
    pub card_ids: Vec<CardId>,

    /// Deck members with at least two active children.
    pub parent_eligible: Vec<CardId>,
}

/// Resolves the deck for `deck_tag` over a snapshot of a tenant's cards:
/// every active card whose hashtags contain the tag.
///
/// Resolution never fails; callers decide whether the resulting deck is
/// large enough to play.
pub fn resolve_deck(cards: &[Card], deck_tag: &HashTag) -> ResolvedDeck {
    let members: Vec<&Card> =
        cards.iter().filter(|c| c.is_active && c.has_tag(deck_tag)).collect();
    let parent_eligible = members
        .iter()
        .filter(|member| resolve_children(cards, member).len() >= 2)
        .map(|member| member.id)
        .collect();
    ResolvedDeck { card_ids: members.iter().map(|c| c.id).collect(), parent_eligible }
}

/// Active cards whose hashtags contain the parent's name.
///
/// A card never appears among its own children, even if an external write
/// smuggled a self-referential hashtag past validation.
pub fn resolve_children(cards: &[Card], parent: &Card) -> Vec<CardId> {
    cards
        .iter()
        .filter(|c| c.is_active && c.id != parent.id && c.has_tag(&parent.name))
        .map(|c| c.id)
        .collect()
}

/// [resolve_children] by parent id. An unknown parent has no children.
pub fn resolve_children_of(cards: &[Card], parent_id: CardId) -> Vec<CardId> {
    match cards.iter().find(|c| c.id == parent_id) {
        Some(parent) => resolve_children(cards, parent),
        None => vec![],
    }
}
