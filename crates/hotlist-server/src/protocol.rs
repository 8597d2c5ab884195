// JSON messages exchanged with clients over the WebSocket connection.
//
// Every text frame from a client carries one `Request`; the server answers
// each with exactly one `Response` frame, in order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hotlist_core::model::{NewEvent, NewUser, RankedEvent};

/// A client request, tagged by `type` with its fields under `payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    /// The ranked list, optionally windowed to ranks `start..=end`.
    ListEvents {
        #[serde(default)]
        start: Option<i64>,
        #[serde(default)]
        end: Option<i64>,
    },
    /// One event by its position in the vote-only order.
    GetEvent { index: i64 },
    AddEvent(NewEvent),
    RegisterUser(NewUser),
    #[serde(rename_all = "camelCase")]
    Vote {
        event_id: i64,
        user_id: i64,
        vote_num: u32,
        /// Defaults to the time the server receives the request.
        #[serde(default)]
        time: Option<DateTime<Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    Buy {
        event_id: i64,
        amount: u32,
        rank_num: u32,
    },
}

/// The server's answer to one request, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    Events { events: Vec<RankedEvent> },
    Event { event: RankedEvent },
    Created { id: i64 },
    Ok,
    /// A buy that did not beat the current holder of the rank.
    Declined { message: String },
    /// `code` follows HTTP conventions: 400 for bad input, 404 for unknown
    /// records, 500 for storage failures.
    Error { code: u16, message: String },
}

impl Response {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Response::Error {
            code: 400,
            message: message.into(),
        }
    }
}
