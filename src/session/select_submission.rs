use actix_web::{HttpRequest, HttpResponse, Responder};
use documented::docs_const;
use qstring::QString;
use tracing::{info, warn};

use super::{
    handle_sessions::with_session,
    request::{json_response, session_error_response, session_id_or_fail},
};

/// # Select History
/// Restores a past review into the session's working state. Requires Authentication.
///
/// Takes in a `session_id` and an `index` (see /history).
///
/// The code, review, execution result and suggested fix are restored exactly as they were when the review was made.
///
/// Returns the working state as Json (see /state).
///
/// If the session id is not given, an UnprocessableEntity response is returned.
///
/// If the index is missing or not a number, a BadRequest response is returned.
///
/// If the session or the index could not be found, a NotFound response is returned and nothing changes.
#[docs_const]
pub async fn select_submission(req: HttpRequest) -> impl Responder {
    let qstring = QString::from(req.query_string());
    let headers = req.headers();
    crate::auth::authorize_or_fail!(qstring, headers);

    let session_id = match session_id_or_fail(&qstring, headers) {
        Ok(session_id) => session_id,
        Err(response) => return response,
    };

    let index = match qstring.get("index").map(str::parse::<usize>) {
        Some(Ok(index)) => index,
        None | Some(Err(_)) => {
            warn!("The User tried to select a submission without a valid index.");
            return HttpResponse::BadRequest()
                .body("Index not found or invalid. Please provide a non-negative index in the query parameters.");
        }
    };

    let result = with_session(&session_id, |session| {
        session
            .select_submission(index)
            .map(|()| session.working.clone())
    });
    match result {
        Ok(Ok(working)) => {
            info!("Restored submission {} in session {}.", index, session_id);
            json_response(&working)
        }
        Ok(Err(e)) | Err(e) => session_error_response(&e),
    }
}
