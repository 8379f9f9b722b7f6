// Reading the common parameters of the session endpoints and answering in the common way.

use actix_web::{http::header::HeaderMap, HttpResponse};
use qstring::QString;
use serde::Serialize;
use tracing::{error, trace, warn};

use crate::auth::get_first_matching_field;

use super::types::SessionError;

/// Where a session id may be given: as query parameter or as header.
pub const SESSION_ID_FIELDS: [&str; 3] = ["session_id", "x-session-id", "session-id"];

/// Returns the session id of the request, or a 422 response if there is none.
pub fn session_id_or_fail(qstring: &QString, headers: &HeaderMap) -> Result<String, HttpResponse> {
    match get_first_matching_field(qstring, headers, &SESSION_ID_FIELDS) {
        Some(session_id) => Ok(session_id.to_string()),
        None => {
            warn!("The User sent a request without a session ID.");
            Err(HttpResponse::UnprocessableEntity().body(
                "Session ID not found. Please provide a session_id in the query parameters or create one with /newsession.",
            ))
        }
    }
}

/// The code a request carries: the body if it isn't empty, else the `code` query parameter.
/// None means the session's current code should be used.
pub fn code_from_request(body: &str, qstring: &QString) -> Option<String> {
    if !body.is_empty() {
        trace!("Taking the code from the request body.");
        return Some(body.to_string());
    }
    qstring
        .get("code")
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}

/// Maps a session error to the response the client gets.
pub fn session_error_response(e: &SessionError) -> HttpResponse {
    match e {
        SessionError::NotFound => HttpResponse::NotFound().body(e.to_string()),
        SessionError::NoSuggestedFix => HttpResponse::Conflict().body(e.to_string()),
        SessionError::IndexOutOfRange { .. } => HttpResponse::NotFound().body(e.to_string()),
        SessionError::LockPoisoned => {
            error!("The session store is poisoned.");
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

/// Serializes the value and sends it as JSON.
pub fn json_response<T: Serialize>(value: &T) -> HttpResponse {
    match serde_json::to_string(value) {
        Ok(json) => {
            trace!("Returning: {}", json);
            HttpResponse::Ok()
                .content_type("application/json")
                .body(json)
        }
        Err(e) => {
            error!("Error serializing the response: {:?}", e);
            HttpResponse::InternalServerError().body("Error serializing the response.")
        }
    }
}
