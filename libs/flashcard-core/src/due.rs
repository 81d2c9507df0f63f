//! Due-card selection.
//!
//! A card is due when it was never reviewed, or when its last review plus
//! its interval has been reached. Never-reviewed cards come first in card id
//! order, then reviewed cards from the stalest review onwards.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::types::{CardWithState, ReviewState};

/// Whether a card with the given state (or none yet) is due at `now`.
pub fn is_due(state: Option<&ReviewState>, now: DateTime<Utc>) -> bool {
    state.map_or(true, |s| s.is_due_at(now))
}

/// Select at most `limit` due cards from a snapshot, in review order.
///
/// The snapshot is expected to be already scoped to one user (and optionally
/// one deck) whose ownership has been checked by the caller.
pub fn select_due(
    snapshot: impl IntoIterator<Item = CardWithState>,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<CardWithState> {
    let mut due: Vec<CardWithState> = snapshot
        .into_iter()
        .filter(|entry| is_due(entry.state.as_ref(), now))
        .collect();

    due.sort_by(review_order);
    due.truncate(limit);
    due
}

fn review_order(a: &CardWithState, b: &CardWithState) -> Ordering {
    match (a.last_reviewed_at(), b.last_reviewed_at()) {
        (None, None) => a.card.id.cmp(&b.card.id),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.card.id.cmp(&b.card.id)),
    }
}
