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

use chrono::{DateTime, Utc};
use data::core::errors::{EngineError, Value};
use data::core::primitives::{CardId, PlayId};
use data::plays::hierarchy::{ActiveChild, ChildResult, HierarchicalPhase, HierarchicalState};
use data::plays::play::{Play, PlayPhase, PlayStatus};
use tracing::debug;

/// How a play left its swipe/vote loop.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CompletionKind {
    /// No ranked parents: the play is finished outright.
    Finalized,
    /// Ranked parents exist; child sub-sessions must run before the play
    /// can finalize.
    AwaitingChildren,
}

/// Progress after recording one child ranking.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum HierarchyProgress {
    /// Another parent awaits a child sub-session.
    NextParent(CardId),
    /// Every child has reported; the play is finalized.
    Finalized,
}

/// The parent-eligible cards of `play`'s personal ranking, in rank order.
pub fn ranked_parents(play: &Play) -> Vec<CardId> {
    play.personal_ranking
        .iter()
        .copied()
        .filter(|card| play.parent_eligible.contains(card))
        .collect()
}

/// Transitions a play whose deck is exhausted: finalizes it outright when
/// its ranking holds no eligible parents, otherwise parks it to await child
/// sub-sessions.
pub fn on_deck_exhausted(play: &mut Play, now: DateTime<Utc>) -> CompletionKind {
    play.phase = PlayPhase::Completed;
    let parents = ranked_parents(play);
    if parents.is_empty() {
        play.status = PlayStatus::Completed;
        play.completed_at = Some(now);
        play.hierarchical_phase = HierarchicalPhase::Finalized;
        debug!(?play.id, ranked = play.personal_ranking.len(), "Play finalized");
        return CompletionKind::Finalized;
    }

    play.status = PlayStatus::WaitingForChildren;
    play.hierarchical_phase = HierarchicalPhase::Parents;
    play.hierarchical_state = Some(HierarchicalState { pending: parents, ..Default::default() });
    debug!(?play.id, "Play awaiting child sub-sessions");
    CompletionKind::AwaitingChildren
}

/// The parent card whose child sub-session should run next.
pub fn next_pending_parent(play: &Play) -> Option<CardId> {
    play.hierarchical_state.as_ref().and_then(|state| state.pending.first().copied())
}

/// Marks `child_play` as the in-flight sub-session for `parent_card`.
pub fn set_active_child(play: &mut Play, parent_card: CardId, child_play: PlayId) -> Value<()> {
    let id = play.id;
    let state = hierarchical_state_mut(play)?;
    state.active = Some(ActiveChild { parent_card, play: child_play });
    debug!(?id, ?parent_card, ?child_play, "Child sub-session started");
    Ok(())
}

/// Records a finished child ranking under `parent_card` and advances the
/// pending list, finalizing the play when it was the last one.
pub fn record_child_result(
    play: &mut Play,
    parent_card: CardId,
    ranking: Vec<CardId>,
    now: DateTime<Utc>,
) -> Value<HierarchyProgress> {
    if play.status != PlayStatus::WaitingForChildren {
        return Err(EngineError::WrongState { play: play.id, phase: play.phase });
    }
    let id = play.id;
    let personal = play.personal_ranking.clone();

    let state = hierarchical_state_mut(play)?;
    if !state.pending.contains(&parent_card) {
        return Err(EngineError::InvariantViolation {
            play: id,
            detail: format!("no pending child sub-session for card {parent_card}"),
        });
    }

    state.results.push(ChildResult { parent: parent_card, ranking });
    state.pending.retain(|&c| c != parent_card);
    state.active = None;

    if let Some(&next) = state.pending.first() {
        return Ok(HierarchyProgress::NextParent(next));
    }

    state.final_ranking = Some(spliced_ranking(&personal, &state.results));
    play.hierarchical_phase = HierarchicalPhase::Finalized;
    play.status = PlayStatus::Completed;
    play.completed_at = Some(now);
    debug!(?play.id, "Hierarchical ranking finalized");
    Ok(HierarchyProgress::Finalized)
}

/// Walks the personal ranking, splicing each parent's child ranking in
/// directly beneath it. Cards without a recorded child ranking pass through
/// unchanged.
pub fn spliced_ranking(personal: &[CardId], results: &[ChildResult]) -> Vec<CardId> {
    let mut spliced = Vec::with_capacity(
        personal.len() + results.iter().map(|r| r.ranking.len()).sum::<usize>(),
    );
    for &card in personal {
        spliced.push(card);
        if let Some(result) = results.iter().find(|r| r.parent == card) {
            spliced.extend(result.ranking.iter().copied());
        }
    }
    spliced
}

fn hierarchical_state_mut(play: &mut Play) -> Value<&mut HierarchicalState> {
    let id = play.id;
    play.hierarchical_state.as_mut().ok_or_else(|| EngineError::InvariantViolation {
        play: id,
        detail: "hierarchical state missing".into(),
    })
}

#[cfg(test)]
mod tests {
    use data::core::primitives::{HashTag, SessionId, TenantId};
    use data::plays::play::{deck_uuid, NewPlay};
    use rand_xoshiro::rand_core::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    use uuid::Uuid;

    use super::*;

    fn card(n: u128) -> CardId {
        CardId(Uuid::from_u128(n))
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn play_with(deck: Vec<CardId>, parent_eligible: Vec<CardId>) -> Play {
        let tag = HashTag::new("#deck");
        Play::new(
            NewPlay::builder()
                .id(PlayId(Uuid::from_u128(100)))
                .tenant_id(TenantId(Uuid::from_u128(1)))
                .session_id(SessionId(Uuid::from_u128(2)))
                .deck_uuid(deck_uuid(&tag, &deck))
                .deck_tag(tag)
                .deck(deck)
                .parent_eligible(parent_eligible)
                .created_at(now())
                .ttl_seconds(86_400)
                .rng(Xoshiro256StarStar::seed_from_u64(5))
                .build(),
        )
    }

    #[test]
    fn no_parents_finalizes_outright() {
        let mut play = play_with(vec![card(1), card(2)], vec![]);
        play.personal_ranking = vec![card(2), card(1)];

        assert_eq!(on_deck_exhausted(&mut play, now()), CompletionKind::Finalized);
        assert_eq!(play.status, PlayStatus::Completed);
        assert_eq!(play.completed_at, Some(now()));
        assert_eq!(play.hierarchical_phase, HierarchicalPhase::Finalized);
        assert_eq!(play.final_ranking(), &[card(2), card(1)]);
        assert!(play.hierarchical_state.is_none());
    }

    #[test]
    fn ranked_parents_park_the_play() {
        let parent = card(1);
        let mut play = play_with(vec![parent, card(2)], vec![parent]);
        play.personal_ranking = vec![card(2), parent];

        assert_eq!(on_deck_exhausted(&mut play, now()), CompletionKind::AwaitingChildren);
        assert_eq!(play.status, PlayStatus::WaitingForChildren);
        assert_eq!(play.completed_at, None);
        assert_eq!(play.hierarchical_phase, HierarchicalPhase::Parents);
        assert_eq!(next_pending_parent(&play), Some(parent));
    }

    #[test]
    fn eligible_parents_that_were_disliked_are_skipped() {
        let parent = card(1);
        let mut play = play_with(vec![parent, card(2)], vec![parent]);
        // The parent was swiped left and never ranked.
        play.personal_ranking = vec![card(2)];
        assert_eq!(on_deck_exhausted(&mut play, now()), CompletionKind::Finalized);
    }

    #[test]
    fn parents_are_processed_in_rank_order() {
        let (p1, p2) = (card(1), card(2));
        let mut play = play_with(vec![p1, p2, card(3)], vec![p1, p2]);
        // p2 outranks p1.
        play.personal_ranking = vec![p2, card(3), p1];

        on_deck_exhausted(&mut play, now());
        assert_eq!(next_pending_parent(&play), Some(p2));

        let progress = record_child_result(&mut play, p2, vec![card(21), card(22)], now()).unwrap();
        assert_eq!(progress, HierarchyProgress::NextParent(p1));

        let progress = record_child_result(&mut play, p1, vec![card(11)], now()).unwrap();
        assert_eq!(progress, HierarchyProgress::Finalized);
        assert_eq!(
            play.final_ranking(),
            &[p2, card(21), card(22), card(3), p1, card(11)]
        );
        assert_eq!(play.status, PlayStatus::Completed);
    }

    #[test]
    fn splice_preserves_parent_and_sibling_order() {
        let personal = [card(1), card(2), card(3)];
        let results = [
            ChildResult { parent: card(3), ranking: vec![card(31), card(30)] },
            ChildResult { parent: card(1), ranking: vec![card(10)] },
        ];
        assert_eq!(
            spliced_ranking(&personal, &results),
            vec![card(1), card(10), card(2), card(3), card(31), card(30)]
        );
        // Length invariant: parents plus every child.
        assert_eq!(spliced_ranking(&personal, &results).len(), 3 + 3);
    }

    #[test]
    fn recording_an_unexpected_parent_is_an_invariant_violation() {
        let parent = card(1);
        let mut play = play_with(vec![parent, card(2)], vec![parent]);
        play.personal_ranking = vec![parent, card(2)];
        on_deck_exhausted(&mut play, now());

        let err = record_child_result(&mut play, card(99), vec![], now()).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation { .. }));
    }
}
