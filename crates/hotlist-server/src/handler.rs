// Request dispatch: turns one protocol request into a core call and maps the
// outcome back to a response.

use chrono::Utc;
use tracing::{debug, error, warn};

use hotlist_core::model::{Trade, Vote};
use hotlist_core::{HotList, ServiceError};

use crate::protocol::{Request, Response};

/// Handle a raw text frame. Malformed JSON becomes a 400 response rather
/// than an error, so a bad frame never tears down the connection.
pub fn handle_text(service: &HotList, text: &str) -> Response {
    match serde_json::from_str::<Request>(text) {
        Ok(request) => handle_request(service, request),
        Err(e) => {
            warn!("Malformed request: {e}");
            Response::bad_request(format!("malformed request: {e}"))
        }
    }
}

pub fn handle_request(service: &HotList, request: Request) -> Response {
    debug!("Handling {request:?}");
    let result = match request {
        Request::ListEvents { start, end } => service
            .ranked_list(start, end)
            .map(|events| Response::Events { events }),
        Request::GetEvent { index } => service
            .event_by_natural_index(index)
            .map(|event| Response::Event { event }),
        Request::AddEvent(event) => service
            .add_event(&event)
            .map(|id| Response::Created { id }),
        Request::RegisterUser(user) => service
            .register_user(&user)
            .map(|id| Response::Created { id }),
        Request::Vote {
            event_id,
            user_id,
            vote_num,
            time,
        } => {
            let vote = Vote {
                vote_num,
                event_id,
                user_id,
                time: time.unwrap_or_else(Utc::now),
            };
            service.submit_vote(&vote).map(|()| Response::Ok)
        }
        Request::Buy {
            event_id,
            amount,
            rank_num,
        } => service
            .submit_buy(&Trade { amount, rank_num }, event_id)
            .map(|accepted| {
                if accepted {
                    Response::Ok
                } else {
                    Response::Declined {
                        message: format!("bid of {amount} does not beat rank {rank_num}"),
                    }
                }
            }),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

fn error_response(err: &ServiceError) -> Response {
    let code = match err {
        ServiceError::NotFound { .. } => 404,
        ServiceError::InvalidIndex { .. }
        | ServiceError::InvalidRange { .. }
        | ServiceError::InvalidRank(_)
        | ServiceError::InvalidAmount(_) => 400,
        ServiceError::Storage(_) => 500,
    };
    if err.is_client_error() {
        debug!("Request rejected: {err}");
    } else {
        error!("Request failed: {err}");
    }
    Response::Error {
        code,
        message: err.to_string(),
    }
}
