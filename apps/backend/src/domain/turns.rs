//! Turn order over the seats in play and the rules for timing out a seat.

use time::OffsetDateTime;

/// Seats after `current` in turn order; every seat when `current` is `None`.
///
/// The caller walks this, skipping seats whose hand cannot continue; running
/// off the end means every player has been resolved.
pub fn seats_after(order: &[i16], current: Option<i16>) -> impl Iterator<Item = i16> + '_ {
    let start = match current {
        None => 0,
        Some(seat) => order
            .iter()
            .position(|s| *s == seat)
            .map_or(order.len(), |idx| idx + 1),
    };
    order[start..].iter().copied()
}

pub fn next_seat(order: &[i16], current: Option<i16>) -> Option<i16> {
    seats_after(order, current).next()
}

/// Snapshot of a seat taken when its turn was last touched.
#[derive(Debug, Clone, Copy)]
pub struct TurnCheck {
    pub action_count: usize,
    pub is_making_decision: bool,
    pub decision_deadline: Option<OffsetDateTime>,
}

/// Whether a scheduled nudge should force the seat to stand: nothing has
/// happened since it was scheduled, the seat is still deciding and its
/// deadline has passed.
pub fn nudge_is_due(scheduled_action_count: usize, now_state: TurnCheck, now: OffsetDateTime) -> bool {
    now_state.action_count == scheduled_action_count
        && now_state.is_making_decision
        && now_state.decision_deadline.is_some_and(|d| d <= now)
}

/// At most one inactivity check per decision window.
pub fn needs_inactivity_check(
    decision_deadline: Option<OffsetDateTime>,
    inactivity_check_at: Option<OffsetDateTime>,
) -> bool {
    match (decision_deadline, inactivity_check_at) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(deadline), Some(checked)) => deadline > checked,
    }
}
