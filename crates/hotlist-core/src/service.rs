// Core API: each call runs as one transaction against the database.

use tracing::info;

use crate::db::Database;
use crate::error::{Result, ServiceError};
use crate::model::{NewEvent, NewUser, RankedEvent, Trade, User, Vote};
use crate::store::Repository;
use crate::{mutation, rank};

/// Vote quota given to newly registered users unless configured otherwise.
pub const DEFAULT_VOTE_QUOTA: u32 = 10;

/// The ranking service exposed to the request boundary.
pub struct HotList {
    db: Database,
    default_vote_quota: u32,
}

impl HotList {
    pub fn new(db: Database, default_vote_quota: u32) -> Self {
        HotList {
            db,
            default_vote_quota,
        }
    }

    /// The displayed ranking, optionally narrowed to ranks `start..=end`.
    pub fn ranked_list(&self, start: Option<i64>, end: Option<i64>) -> Result<Vec<RankedEvent>> {
        let ranking = self.db.with_transaction(|repo| {
            let events = repo.list_events()?;
            let trades = repo.list_trades()?;
            Ok(rank::assemble(&events, &trades))
        })?;
        rank::paginate(ranking, start, end)
    }

    /// The event at 1-based `index` of the vote-only order.
    pub fn event_by_natural_index(&self, index: i64) -> Result<RankedEvent> {
        let events = self.db.with_transaction(|repo| repo.list_events())?;
        rank::by_natural_index(&events, index)
    }

    pub fn submit_vote(&self, vote: &Vote) -> Result<()> {
        self.db.with_transaction(|repo| mutation::vote(repo, vote))
    }

    /// Returns `false` when the bid does not beat the current holder.
    pub fn submit_buy(&self, trade: &Trade, event_id: i64) -> Result<bool> {
        self.db
            .with_transaction(|repo| mutation::buy(repo, event_id, trade))
    }

    /// Submit a new event for `event.user_id`, starting at zero votes.
    pub fn add_event(&self, event: &NewEvent) -> Result<i64> {
        let id = self.db.with_transaction(|repo| {
            repo.get_user(event.user_id)?
                .ok_or_else(|| ServiceError::user_not_found(event.user_id))?;
            repo.insert_event(event)
        })?;
        info!("event {} '{}' added by user {}", id, event.event_name, event.user_id);
        Ok(id)
    }

    pub fn register_user(&self, user: &NewUser) -> Result<i64> {
        let quota = i64::from(self.default_vote_quota);
        let id = self
            .db
            .with_transaction(|repo| repo.insert_user(user, quota))?;
        info!("user {} '{}' registered with {} votes", id, user.user_name, quota);
        Ok(id)
    }

    pub fn user(&self, id: i64) -> Result<User> {
        self.db
            .with_transaction(|repo| repo.get_user(id))?
            .ok_or_else(|| ServiceError::user_not_found(id))
    }
}
