// Vote and buy operations.
//
// Both functions expect `repo` to be scoped to one transaction; on error the
// caller discards everything they wrote.

use tracing::{info, warn};

use crate::error::{Result, ServiceError};
use crate::model::{Trade, Vote};
use crate::store::Repository;

/// Apply a vote: the event gains `vote.vote_num` votes and the user's quota
/// drops by the same amount. The quota is not checked first, so it can go
/// negative. A zero vote, or one that would overflow the event's counter, is
/// rejected with `InvalidAmount`.
pub fn vote(repo: &impl Repository, vote: &Vote) -> Result<()> {
    if vote.vote_num == 0 {
        return Err(ServiceError::InvalidAmount(vote.vote_num));
    }
    let mut event = repo
        .get_event(vote.event_id)?
        .ok_or_else(|| ServiceError::event_not_found(vote.event_id))?;
    let mut user = repo
        .get_user(vote.user_id)?
        .ok_or_else(|| ServiceError::user_not_found(vote.user_id))?;

    event.vote_num = event
        .vote_num
        .checked_add(vote.vote_num)
        .ok_or(ServiceError::InvalidAmount(vote.vote_num))?;
    user.vote_num -= i64::from(vote.vote_num);
    if user.vote_num < 0 {
        warn!(
            "user {} is over quota after voting ({} remaining)",
            user.id, user.vote_num
        );
    }

    repo.save_event(&event)?;
    repo.save_user(&user)?;
    repo.record_vote(vote)?;

    info!(
        "user {} cast {} votes on event {} (now {})",
        user.id, vote.vote_num, event.id, event.vote_num
    );
    Ok(())
}

/// Try to buy `trade.rank_num` for `event_id`.
///
/// Returns `Ok(false)` without touching the store when the current top bid
/// for the rank is at least `trade.amount`. On success the event holding the
/// top bid is deleted outright (unless it is the buyer), any lower trades left
/// on the rank are dropped, the buyer's previous trade (an event holds at most
/// one) is replaced, and the new trade is recorded.
pub fn buy(repo: &impl Repository, event_id: i64, trade: &Trade) -> Result<bool> {
    if trade.rank_num == 0 {
        return Err(ServiceError::InvalidRank(trade.rank_num));
    }
    if trade.amount == 0 {
        return Err(ServiceError::InvalidAmount(trade.amount));
    }
    repo.get_event(event_id)?
        .ok_or_else(|| ServiceError::event_not_found(event_id))?;

    let incumbents = repo.list_trades_for_rank(trade.rank_num)?;
    if let Some(top) = incumbents.first() {
        if top.amount >= trade.amount {
            warn!(
                "bid of {} for rank {} by event {} declined: event {} holds it at {}",
                trade.amount, trade.rank_num, event_id, top.event_id, top.amount
            );
            return Ok(false);
        }
    }

    if let Some((holder, stale)) = incumbents.split_first() {
        if holder.event_id != event_id {
            info!(
                "event {} outbid for rank {} ({} > {}); deleting it",
                holder.event_id, trade.rank_num, trade.amount, holder.amount
            );
            repo.delete_event(holder.event_id)?;
        }
        for t in stale.iter().filter(|t| t.event_id != event_id) {
            repo.delete_trades_for_event(t.event_id)?;
        }
    }

    repo.delete_trades_for_event(event_id)?;
    let trade_id = repo.save_trade(trade.amount, trade.rank_num, event_id)?;

    info!(
        "trade {} accepted: event {} holds rank {} for {}",
        trade_id, event_id, trade.rank_num, trade.amount
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::model::{NewEvent, NewUser};
    use chrono::Utc;
    use rusqlite::Connection;

    struct Fixture {
        db: Database,
        user_id: i64,
    }

    /// Fresh database with one user holding a quota of 5.
    fn fixture() -> Fixture {
        let db = Database::open(":memory:").expect("in-memory database should open");
        let user_id = db
            .with_transaction(|repo| {
                repo.insert_user(
                    &NewUser {
                        user_name: "xiaoli".into(),
                        gender: "female".into(),
                        age: 19,
                        email: "a@b.com".into(),
                        phone: "18888888888".into(),
                    },
                    5,
                )
            })
            .unwrap();
        Fixture { db, user_id }
    }

    impl Fixture {
        fn add_event(&self, name: &str, votes: u32) -> i64 {
            let user_id = self.user_id;
            self.db
                .with_transaction(|repo| {
                    let id = repo.insert_event(&NewEvent {
                        event_name: name.into(),
                        keyword: "kw".into(),
                        user_id,
                    })?;
                    let mut event = repo.get_event(id)?.unwrap();
                    event.vote_num = votes;
                    repo.save_event(&event)?;
                    Ok(id)
                })
                .unwrap()
        }

        fn run<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
            self.db.with_transaction(f)
        }
    }

    fn vote_of(num: u32, event_id: i64, user_id: i64) -> Vote {
        Vote {
            vote_num: num,
            event_id,
            user_id,
            time: Utc::now(),
        }
    }

    // ------------------------------------------------------------------
    // vote
    // ------------------------------------------------------------------

    #[test]
    fn vote_moves_count_from_user_to_event() {
        let fx = fixture();
        let event_id = fx.add_event("a", 2);

        fx.run(|repo| vote(repo, &vote_of(2, event_id, fx.user_id)))
            .unwrap();

        let (event, user) = fx
            .run(|repo| Ok((repo.get_event(event_id)?, repo.get_user(fx.user_id)?)))
            .unwrap();
        assert_eq!(event.unwrap().vote_num, 4);
        assert_eq!(user.unwrap().vote_num, 3);
    }

    #[test]
    fn vote_beyond_quota_goes_negative() {
        let fx = fixture();
        let event_id = fx.add_event("a", 0);

        fx.run(|repo| vote(repo, &vote_of(8, event_id, fx.user_id)))
            .unwrap();

        let user = fx.run(|repo| repo.get_user(fx.user_id)).unwrap().unwrap();
        assert_eq!(user.vote_num, -3);
    }

    #[test]
    fn vote_on_missing_event_is_not_found() {
        let fx = fixture();
        let err = fx
            .run(|repo| vote(repo, &vote_of(1, 404, fx.user_id)))
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { id: 404, .. }));

        let user = fx.run(|repo| repo.get_user(fx.user_id)).unwrap().unwrap();
        assert_eq!(user.vote_num, 5);
    }

    #[test]
    fn vote_by_missing_user_changes_nothing() {
        let fx = fixture();
        let event_id = fx.add_event("a", 1);

        let err = fx
            .run(|repo| vote(repo, &vote_of(1, event_id, 999)))
            .unwrap_err();
        assert_eq!(err.to_string(), "user 999 not found");

        let event = fx.run(|repo| repo.get_event(event_id)).unwrap().unwrap();
        assert_eq!(event.vote_num, 1);
    }

    // ------------------------------------------------------------------
    // buy
    // ------------------------------------------------------------------

    #[test]
    fn first_bid_claims_empty_rank() {
        let fx = fixture();
        let event_id = fx.add_event("a", 0);

        let accepted = fx
            .run(|repo| buy(repo, event_id, &Trade { amount: 100, rank_num: 1 }))
            .unwrap();
        assert!(accepted);

        let trades = fx.run(|repo| repo.list_trades_for_rank(1)).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].event_id, event_id);
        assert_eq!(trades[0].amount, 100);
    }

    #[test]
    fn vote_overflowing_event_count_is_rejected_and_rolled_back() {
        let fx = fixture();
        let event_id = fx.add_event("a", 0);
        fx.run(|repo| vote(repo, &vote_of(5, event_id, fx.user_id)))
            .unwrap();

        let err = fx
            .run(|repo| vote(repo, &vote_of(u32::MAX, event_id, fx.user_id)))
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidAmount(u32::MAX)));

        let (event, user) = fx
            .run(|repo| Ok((repo.get_event(event_id)?, repo.get_user(fx.user_id)?)))
            .unwrap();
        assert_eq!(event.unwrap().vote_num, 5);
        assert_eq!(user.unwrap().vote_num, 0);
    }

    #[test]
    fn zero_vote_is_rejected() {
        let fx = fixture();
        let event_id = fx.add_event("a", 1);

        let err = fx
            .run(|repo| vote(repo, &vote_of(0, event_id, fx.user_id)))
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidAmount(0)));

        let user = fx.run(|repo| repo.get_user(fx.user_id)).unwrap().unwrap();
        assert_eq!(user.vote_num, 5);
    }

    #[test]
    fn higher_bid_deletes_only_the_slot_holder() {
        let fx = fixture();
        let first = fx.add_event("first", 5);
        let second = fx.add_event("second", 5);
        let buyer = fx.add_event("buyer", 5);
        fx.run(|repo| {
            repo.save_trade(50, 1, first)?;
            repo.save_trade(60, 1, second)
        })
        .unwrap();

        let accepted = fx
            .run(|repo| buy(repo, buyer, &Trade { amount: 100, rank_num: 1 }))
            .unwrap();
        assert!(accepted);

        let (events, trades) = fx
            .run(|repo| Ok((repo.list_events()?, repo.list_trades()?)))
            .unwrap();
        // `second` held the slot at 60; the stale 50 bid is dropped but
        // `first` itself survives.
        let remaining: Vec<i64> = events.iter().map(|e| e.id).collect();
        assert_eq!(remaining, vec![first, buyer]);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].event_id, buyer);
    }

    #[test]
    fn equal_or_lower_bid_is_declined() {
        let fx = fixture();
        let holder = fx.add_event("holder", 0);
        let challenger = fx.add_event("challenger", 0);
        fx.run(|repo| repo.save_trade(100, 1, holder)).unwrap();

        for amount in [100, 40] {
            let accepted = fx
                .run(|repo| buy(repo, challenger, &Trade { amount, rank_num: 1 }))
                .unwrap();
            assert!(!accepted, "bid of {amount} should lose to 100");
        }

        let (events, trades) = fx
            .run(|repo| Ok((repo.list_events()?, repo.list_trades()?)))
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].event_id, holder);
    }

    #[test]
    fn buying_on_missing_event_is_not_found() {
        let fx = fixture();
        let err = fx
            .run(|repo| buy(repo, 31, &Trade { amount: 10, rank_num: 1 }))
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { id: 31, .. }));
    }

    #[test]
    fn outbidding_own_slot_keeps_the_event() {
        let fx = fixture();
        let holder = fx.add_event("holder", 0);
        fx.run(|repo| buy(repo, holder, &Trade { amount: 10, rank_num: 2 }))
            .unwrap();

        let accepted = fx
            .run(|repo| buy(repo, holder, &Trade { amount: 20, rank_num: 2 }))
            .unwrap();
        assert!(accepted);

        let (event, trades) = fx
            .run(|repo| Ok((repo.get_event(holder)?, repo.list_trades()?)))
            .unwrap();
        assert!(event.is_some());
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].amount, 20);
    }

    #[test]
    fn new_trade_replaces_buyers_previous_slot() {
        let fx = fixture();
        let event_id = fx.add_event("mover", 0);
        fx.run(|repo| buy(repo, event_id, &Trade { amount: 10, rank_num: 3 }))
            .unwrap();
        fx.run(|repo| buy(repo, event_id, &Trade { amount: 5, rank_num: 1 }))
            .unwrap();

        let trades = fx.run(|repo| repo.list_trades()).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].rank_num, 1);
    }

    #[test]
    fn rank_zero_and_zero_amount_are_rejected() {
        let fx = fixture();
        let event_id = fx.add_event("a", 0);
        assert!(matches!(
            fx.run(|repo| buy(repo, event_id, &Trade { amount: 10, rank_num: 0 })),
            Err(ServiceError::InvalidRank(0))
        ));
        assert!(matches!(
            fx.run(|repo| buy(repo, event_id, &Trade { amount: 0, rank_num: 1 })),
            Err(ServiceError::InvalidAmount(0))
        ));
    }
}
