// Rank assembly: natural vote order merged with purchased rank slots.
//
// Everything here is a pure function over a snapshot of events and trades;
// the caller is responsible for reading both from the same transaction.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{Result, ServiceError};
use crate::model::{Event, RankedEvent, TradeRecord};

/// Events sorted by votes, most first. The sort is stable, so ties keep the
/// order of `events` (insertion order when read from the store).
pub fn natural_order(events: &[Event]) -> Vec<&Event> {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by(|a, b| b.vote_num.cmp(&a.vote_num));
    ordered
}

/// For every rank that has trades, the winning one: highest amount, with
/// the earliest recorded trade taking an amount tie.
pub fn winning_trades(trades: &[TradeRecord]) -> HashMap<u32, &TradeRecord> {
    let mut winners: HashMap<u32, &TradeRecord> = HashMap::new();
    for trade in trades {
        winners
            .entry(trade.rank_num)
            .and_modify(|best| {
                if trade.amount > best.amount
                    || (trade.amount == best.amount && trade.id < best.id)
                {
                    *best = trade;
                }
            })
            .or_insert(trade);
    }
    winners
}

/// The result of merging natural order with trade pins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    /// Every event exactly once, ordered by `now_rank` (1..=N).
    pub events: Vec<RankedEvent>,
    /// How many events took their slot from natural order rather than a
    /// winning trade.
    pub unpinned: usize,
}

/// Assemble the displayed order.
///
/// Ranks 1..=N are walked in order. A rank whose winning trade points at a
/// known, not-yet-placed event is pinned to that event; trades for ranks
/// beyond N never apply. All remaining ranks are filled from the natural
/// order with the events that were not pinned.
pub fn assemble(events: &[Event], trades: &[TradeRecord]) -> Ranking {
    let total = events.len();
    let by_id: HashMap<i64, &Event> = events.iter().map(|e| (e.id, e)).collect();
    let winners = winning_trades(trades);

    let mut pinned: HashMap<usize, &Event> = HashMap::new();
    let mut pinned_ids: HashSet<i64> = HashSet::new();
    for rank in 1..=total {
        let Ok(rank_num) = u32::try_from(rank) else {
            break;
        };
        let Some(trade) = winners.get(&rank_num) else {
            continue;
        };
        match by_id.get(&trade.event_id) {
            Some(event) if pinned_ids.insert(event.id) => {
                pinned.insert(rank, *event);
            }
            Some(_) => debug!(
                "event {} already pinned; rank {} falls back to vote order",
                trade.event_id, rank
            ),
            None => debug!("trade {} points at missing event {}", trade.id, trade.event_id),
        }
    }

    let mut natural = natural_order(events)
        .into_iter()
        .filter(|e| !pinned_ids.contains(&e.id));

    let mut ranked = Vec::with_capacity(total);
    for rank in 1..=total {
        let event = match pinned.get(&rank) {
            Some(event) => *event,
            // Pinned and unpinned sets partition `events`, so the iterator
            // holds exactly as many events as there are unpinned ranks.
            None => match natural.next() {
                Some(event) => event,
                None => break,
            },
        };
        ranked.push(RankedEvent::new(event, rank));
    }

    debug!(
        "assembled {} events ({} pinned by trades)",
        ranked.len(),
        pinned.len()
    );

    Ranking {
        unpinned: total - pinned.len(),
        events: ranked,
    }
}

/// Apply the caller's optional `start`/`end` (1-based, inclusive) window.
///
/// The window only applies when both bounds are given and at least one
/// event is ranked by votes; otherwise the full list comes back unchanged.
pub fn paginate(
    ranking: Ranking,
    start: Option<i64>,
    end: Option<i64>,
) -> Result<Vec<RankedEvent>> {
    let (Some(start), Some(end)) = (start, end) else {
        return Ok(ranking.events);
    };
    if ranking.unpinned == 0 {
        return Ok(ranking.events);
    }

    let len = ranking.events.len();
    let in_bounds = start >= 1 && start <= end && usize::try_from(end).is_ok_and(|e| e <= len);
    if !in_bounds {
        return Err(ServiceError::InvalidRange { start, end, len });
    }

    // Bounds were checked above, so both casts are lossless.
    let (from, to) = (start as usize - 1, end as usize);
    let mut events = ranking.events;
    events.truncate(to);
    Ok(events.split_off(from))
}

/// Look up the event at a 1-based position of the natural (vote) order.
pub fn by_natural_index(events: &[Event], index: i64) -> Result<RankedEvent> {
    let ordered = natural_order(events);
    let position = usize::try_from(index)
        .ok()
        .filter(|i| (1..=ordered.len()).contains(i))
        .ok_or(ServiceError::InvalidIndex {
            index,
            len: ordered.len(),
        })?;
    Ok(RankedEvent::new(ordered[position - 1], position))
}
