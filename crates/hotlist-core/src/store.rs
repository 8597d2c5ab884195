// Storage interface consumed by the rank engine and the mutation logic.

use crate::error::Result;
use crate::model::{Event, NewEvent, NewUser, TradeRecord, User, Vote};

/// Key-based access to events, users, trades and the vote log.
///
/// Implementations are expected to be scoped to a single transaction: the
/// core runs every operation against one `Repository` value and either
/// commits or discards all of its writes.
pub trait Repository {
    /// All events in insertion (id) order.
    fn list_events(&self) -> Result<Vec<Event>>;
    fn get_event(&self, id: i64) -> Result<Option<Event>>;
    /// Insert a new event with zero votes and return its id.
    fn insert_event(&self, event: &NewEvent) -> Result<i64>;
    fn save_event(&self, event: &Event) -> Result<()>;
    /// Delete an event along with its trades and vote log rows.
    fn delete_event(&self, id: i64) -> Result<()>;

    fn insert_user(&self, user: &NewUser, vote_num: i64) -> Result<i64>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn save_user(&self, user: &User) -> Result<()>;

    /// All trades, oldest first.
    fn list_trades(&self) -> Result<Vec<TradeRecord>>;
    /// Trades recorded for `rank_num`, highest amount first.
    fn list_trades_for_rank(&self, rank_num: u32) -> Result<Vec<TradeRecord>>;
    fn save_trade(&self, amount: u32, rank_num: u32, event_id: i64) -> Result<i64>;
    /// Remove every trade attached to `event_id`, returning how many went.
    fn delete_trades_for_event(&self, event_id: i64) -> Result<usize>;

    /// Append a vote to the audit log.
    fn record_vote(&self, vote: &Vote) -> Result<()>;
}
