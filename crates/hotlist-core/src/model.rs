// Records exchanged between the store, the rank engine and the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-submitted item competing for rank by vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub event_name: String,
    pub keyword: String,
    /// Votes received so far.
    pub vote_num: u32,
    /// Owning user.
    pub user_id: i64,
}

/// Submission payload for a new event. Events always start with zero votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub event_name: String,
    pub keyword: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub user_name: String,
    pub gender: String,
    pub age: u32,
    pub email: String,
    pub phone: String,
    /// Remaining vote quota. Signed: votes are charged without a balance
    /// check, so the quota can go below zero.
    pub vote_num: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub user_name: String,
    pub gender: String,
    pub age: u32,
    pub email: String,
    pub phone: String,
}

/// A vote cast by `user_id` on `event_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub vote_num: u32,
    pub event_id: i64,
    pub user_id: i64,
    pub time: DateTime<Utc>,
}

/// A bid to pin an event at `rank_num` (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub amount: u32,
    pub rank_num: u32,
}

/// A persisted, accepted trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub id: i64,
    pub amount: u32,
    pub rank_num: u32,
    pub event_id: i64,
}

/// An event annotated with its displayed rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEvent {
    pub id: i64,
    pub event_name: String,
    pub keyword: String,
    pub vote_num: u32,
    pub user_id: i64,
    pub now_rank: usize,
}

impl RankedEvent {
    pub fn new(event: &Event, now_rank: usize) -> Self {
        RankedEvent {
            id: event.id,
            event_name: event.event_name.clone(),
            keyword: event.keyword.clone(),
            vote_num: event.vote_num,
            user_id: event.user_id,
            now_rank,
        }
    }
}
