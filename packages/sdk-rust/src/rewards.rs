//! Farming reward accrual.
//!
//! A farming state pays `tokens_per_period` at every snapshot, split between
//! stakers pro rata to their stake at that instant. Each period reward is
//! released in two tranches:
//!
//! ```text
//! immediate = floor(reward / 3)         claimable once the snapshot exists
//! deferred  = reward - immediate        claimable once vesting_period elapsed
//! ```
//!
//! A ticket keeps one checkpoint per tranche (`last_withdraw_time` and
//! `last_vested_withdraw_time`); snapshots at or before a checkpoint have
//! already paid out that tranche. Nothing here reads the clock: `now` is
//! always passed in.

use log::{debug, trace};
use solana_sdk::pubkey::Pubkey;

use crate::constants::{DEFAULT_FARMING_TICKET_END_TIME, PRE_VESTING_DENOMINATOR};
use crate::state::{FarmingSnapshot, FarmingState, FarmingTicket, Keyed, SnapshotQueue};
use crate::types::RewardSummary;

// ─── Window ───────────────────────────────────────────────────────────────────

/// Inclusive time bounds a snapshot must fall in to pay each tranche.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardWindow {
    pub immediate_from: i64,
    pub vested_from:    i64,
    pub end:            i64,
}

impl RewardWindow {
    /// Bounds for `ticket` against `state`, given the ticket's checkpoints.
    ///
    /// Both tranches start no earlier than the ticket's own start and the
    /// end of the state's no-withdrawal period.
    pub fn new(ticket: &FarmingTicket, state: &FarmingState, last_withdraw: i64, last_vested: i64) -> Self {
        let floor = ticket
            .start_time
            .max(state.start_time.saturating_add(state.no_withdrawal_time));
        let ticket_end = if ticket.end_time == DEFAULT_FARMING_TICKET_END_TIME {
            state.current_time
        } else {
            ticket.end_time
        };
        Self {
            immediate_from: floor.max(last_withdraw.saturating_add(1)),
            vested_from:    floor.max(last_vested.saturating_add(1)),
            end:            state.current_time.min(ticket_end),
        }
    }

    fn start(&self) -> i64 {
        self.immediate_from.min(self.vested_from)
    }

    fn contains(&self, time: i64) -> bool {
        time >= self.start() && time <= self.end
    }
}

/// `floor(tokens_per_period * staked / snapshot.tokens_frozen)`, or `None`
/// for a snapshot with nothing staked.
pub fn period_reward(tokens_per_period: u64, staked: u64, snapshot: &FarmingSnapshot) -> Option<u128> {
    if snapshot.tokens_frozen == 0 {
        return None;
    }
    Some(tokens_per_period as u128 * staked as u128 / snapshot.tokens_frozen as u128)
}

fn saturate(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

// ─── Accrual ──────────────────────────────────────────────────────────────────

/// Rewards `ticket` can claim from one farming state.
///
/// The snapshot queue is looked up among `queues` by the address the state
/// references; when none matches, or when the deferred checkpoint is already
/// at the state's latest snapshot, the result is zero.
pub fn compute_reward<const N: usize>(
    ticket: &FarmingTicket,
    state:  &Keyed<FarmingState>,
    queues: &[Keyed<SnapshotQueue<N>>],
    now:    i64,
) -> RewardSummary {
    let Some(queue) = queues
        .iter()
        .find(|q| q.address == state.account.farming_snapshots)
    else {
        debug!(
            "no snapshot queue {} for farming state {}",
            state.account.farming_snapshots, state.address
        );
        return RewardSummary::default();
    };
    accrue(ticket, &state.address, &state.account, &queue.account, now)
}

/// Rewards `ticket` can claim from the farming state at `state_address`,
/// reading snapshots from `queue`.
pub fn accrue<const N: usize>(
    ticket:        &FarmingTicket,
    state_address: &Pubkey,
    state:         &FarmingState,
    queue:         &SnapshotQueue<N>,
    now:           i64,
) -> RewardSummary {
    let attached = ticket.attached(state_address);
    let last_withdraw = attached.map_or(0, |a| a.last_withdraw_time);
    let last_vested = attached.map_or(0, |a| a.last_vested_withdraw_time);

    if last_vested >= state.current_time {
        debug!("ticket already settled against {state_address} up to {}", state.current_time);
        return RewardSummary::default();
    }

    let window = RewardWindow::new(ticket, state, last_withdraw, last_vested);
    trace!("reward window for {state_address}: {window:?}");

    let mut immediate: u128 = 0;
    let mut vested: u128 = 0;
    let mut snapshots: u64 = 0;

    for snapshot in queue.chronological().filter(|s| window.contains(s.time)) {
        let Some(reward) = period_reward(state.tokens_per_period, ticket.tokens_frozen, snapshot) else {
            continue;
        };
        let early = reward / PRE_VESTING_DENOMINATOR as u128;
        let deferred = reward - early;

        let pays_immediate = snapshot.time >= window.immediate_from;
        let pays_deferred = snapshot.time >= window.vested_from
            && now.saturating_sub(snapshot.time) >= state.vesting_period;

        if pays_immediate {
            immediate += early;
        }
        if pays_deferred {
            vested += deferred;
        }
        if pays_immediate || pays_deferred {
            snapshots += 1;
        }
    }

    let summary = RewardSummary {
        unclaimed_tokens:    saturate(immediate + vested),
        unclaimed_snapshots: snapshots,
        immediate_tokens:    saturate(immediate),
        vested_tokens:       saturate(vested),
    };
    debug!("ticket reward from {state_address}: {summary:?}");
    summary
}

/// Total rewards of `ticket` across every farming state in `states`.
pub fn compute_rewards_for_ticket<const N: usize>(
    ticket: &FarmingTicket,
    states: &[Keyed<FarmingState>],
    queues: &[Keyed<SnapshotQueue<N>>],
    now:    i64,
) -> RewardSummary {
    states
        .iter()
        .filter(|s| s.account.pool == ticket.pool)
        .map(|s| compute_reward(ticket, s, queues, now))
        .fold(RewardSummary::default(), RewardSummary::merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Padding;
    use crate::state::AttachedFarmingState;

    const TPP: u64 = 3_000;

    fn state(queue: Pubkey, current_time: i64, vesting_period: i64) -> FarmingState {
        FarmingState {
            discriminator:       Padding::default(),
            tokens_unlocked:     0,
            tokens_per_period:   TPP,
            tokens_total:        1_000_000,
            period_length:       100,
            no_withdrawal_time:  0,
            vesting_type:        0,
            vesting_period,
            start_time:          0,
            current_time,
            pool:                Pubkey::default(),
            farming_token_vault: Pubkey::default(),
            farming_snapshots:   queue,
        }
    }

    fn ticket(staked: u64, start_time: i64) -> FarmingTicket {
        FarmingTicket {
            discriminator:   Padding::default(),
            tokens_frozen:   staked,
            start_time,
            end_time:        DEFAULT_FARMING_TICKET_END_TIME,
            user_key:        Pubkey::default(),
            pool:            Pubkey::default(),
            next_attached:   0,
            states_attached: [AttachedFarmingState::default(); 10],
        }
    }

    fn queue<const N: usize>(entries: &[(u64, i64)]) -> SnapshotQueue<N> {
        let mut snapshots = [FarmingSnapshot::default(); N];
        for (slot, &(tokens_frozen, time)) in entries.iter().enumerate() {
            snapshots[slot % N] = FarmingSnapshot { is_initialized: true, tokens_frozen, farming_tokens: 0, time };
        }
        SnapshotQueue { discriminator: Padding::default(), next_index: entries.len() as u64, snapshots }
    }

    #[test]
    fn three_periods_pay_full_reward_without_vesting() {
        let q = queue::<8>(&[(1_000, 100), (2_000, 200), (4_000, 300)]);
        let s = state(Pubkey::new_unique(), 300, 0);
        let t = ticket(500, 50);

        let r = accrue(&t, &Pubkey::new_unique(), &s, &q, 300);
        let expected = 3_000 * 500 / 1_000 + 3_000 * 500 / 2_000 + 3_000 * 500 / 4_000;
        assert_eq!(r.unclaimed_snapshots, 3);
        assert_eq!(r.unclaimed_tokens, expected);
        assert_eq!(r.immediate_tokens + r.vested_tokens, r.unclaimed_tokens);
    }

    #[test]
    fn settled_ticket_yields_nothing() {
        let state_key = Pubkey::new_unique();
        let q = queue::<8>(&[(1_000, 100), (1_000, 200)]);
        let s = state(Pubkey::new_unique(), 200, 0);
        let mut t = ticket(500, 0);
        t.states_attached[0] = AttachedFarmingState {
            farming_state:             state_key,
            last_withdraw_time:        200,
            last_vested_withdraw_time: 200,
        };
        assert_eq!(accrue(&t, &state_key, &s, &q, 10_000), RewardSummary::default());
    }

    #[test]
    fn deferred_tranche_waits_for_vesting() {
        let q = queue::<8>(&[(1_000, 100)]);
        let s = state(Pubkey::new_unique(), 100, 1_000);
        let t = ticket(1_000, 0);
        let key = Pubkey::new_unique();

        // Right after the period: one third only.
        let r = accrue(&t, &key, &s, &q, 100);
        assert_eq!(r.unclaimed_tokens, 1_000);
        assert_eq!(r.vested_tokens, 0);
        assert_eq!(r.unclaimed_snapshots, 1);

        // One second short of vesting: still one third.
        assert_eq!(accrue(&t, &key, &s, &q, 1_099).unclaimed_tokens, 1_000);

        // Vested: the whole period reward.
        let r = accrue(&t, &key, &s, &q, 1_100);
        assert_eq!(r.immediate_tokens, 1_000);
        assert_eq!(r.vested_tokens, 2_000);
        assert_eq!(r.unclaimed_tokens, 3_000);
    }

    #[test]
    fn uneven_reward_leaves_the_remainder_deferred() {
        let q = queue::<8>(&[(1_000, 100)]);
        let mut s = state(Pubkey::new_unique(), 100, 1_000);
        s.tokens_per_period = 1_000;
        let t = ticket(1_000, 0);
        let key = Pubkey::new_unique();

        let early = accrue(&t, &key, &s, &q, 100);
        assert_eq!(early.immediate_tokens, 333);
        assert_eq!(early.vested_tokens, 0);

        let vested = accrue(&t, &key, &s, &q, 1_100);
        assert_eq!(vested.immediate_tokens, 333);
        assert_eq!(vested.vested_tokens, 667);
        assert_eq!(vested.unclaimed_tokens, 1_000);
    }

    #[test]
    fn tranches_use_independent_checkpoints() {
        let key = Pubkey::new_unique();
        let q = queue::<8>(&[(1_000, 100), (1_000, 200)]);
        let s = state(Pubkey::new_unique(), 200, 1_000);
        let mut t = ticket(1_000, 0);
        // The immediate tranche of the first period was withdrawn at 150.
        t.states_attached[0] = AttachedFarmingState {
            farming_state:             key,
            last_withdraw_time:        150,
            last_vested_withdraw_time: 0,
        };

        let r = accrue(&t, &key, &s, &q, 1_150);
        // Snapshot 100: deferred only (vested at 1_100).
        // Snapshot 200: immediate only (vests at 1_200).
        assert_eq!(r.immediate_tokens, 1_000);
        assert_eq!(r.vested_tokens, 2_000);
        assert_eq!(r.unclaimed_snapshots, 2);
    }

    #[test]
    fn window_respects_ticket_bounds_and_lock() {
        let q = queue::<8>(&[(1_000, 100), (1_000, 200), (1_000, 300), (1_000, 400)]);
        let mut s = state(Pubkey::new_unique(), 400, 0);
        let mut t = ticket(1_000, 150);
        t.end_time = 350;
        let key = Pubkey::new_unique();

        let r = accrue(&t, &key, &s, &q, 400);
        assert_eq!(r.unclaimed_snapshots, 2);

        // Nothing before start_time + no_withdrawal_time counts.
        s.no_withdrawal_time = 250;
        let r = accrue(&t, &key, &s, &q, 400);
        assert_eq!(r.unclaimed_snapshots, 1);
    }

    #[test]
    fn empty_snapshots_are_skipped() {
        let q = queue::<8>(&[(0, 100), (1_000, 200)]);
        let s = state(Pubkey::new_unique(), 200, 0);
        let r = accrue(&ticket(100, 0), &Pubkey::new_unique(), &s, &q, 200);
        assert_eq!(r.unclaimed_snapshots, 1);
        assert_eq!(r.unclaimed_tokens, 300);
    }

    #[test]
    fn wrapped_ring_is_read_oldest_first() {
        // Six snapshots into a four-slot ring: the two oldest were overwritten.
        let entries: Vec<(u64, i64)> = (1..=6).map(|i| (1_000, i * 100)).collect();
        let q = queue::<4>(&entries);
        assert_eq!(q.cursor(), 2);

        let s = state(Pubkey::new_unique(), 600, 0);
        let r = accrue(&ticket(1_000, 0), &Pubkey::new_unique(), &s, &q, 600);
        assert_eq!(r.unclaimed_snapshots, 4);
        assert_eq!(r.unclaimed_tokens, 4 * TPP);
    }

    #[test]
    fn missing_queue_yields_nothing() {
        let state_key = Pubkey::new_unique();
        let s = Keyed::new(state_key, state(Pubkey::new_unique(), 200, 0));
        let queues = vec![Keyed::new(Pubkey::new_unique(), queue::<8>(&[(1_000, 100)]))];
        assert_eq!(compute_reward(&ticket(1_000, 0), &s, &queues, 200), RewardSummary::default());
    }

    #[test]
    fn rewards_sum_across_states() {
        let (qa, qb) = (Pubkey::new_unique(), Pubkey::new_unique());
        let states = vec![
            Keyed::new(Pubkey::new_unique(), state(qa, 200, 0)),
            Keyed::new(Pubkey::new_unique(), state(qb, 200, 0)),
        ];
        let queues = vec![
            Keyed::new(qa, queue::<8>(&[(1_000, 100)])),
            Keyed::new(qb, queue::<8>(&[(2_000, 100), (2_000, 200)])),
        ];
        let r = compute_rewards_for_ticket(&ticket(1_000, 0), &states, &queues, 200);
        assert_eq!(r.unclaimed_snapshots, 3);
        assert_eq!(r.unclaimed_tokens, 3_000 + 1_500 + 1_500);
    }
}
