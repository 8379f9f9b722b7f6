use actix_web::{HttpRequest, HttpResponse, Responder};
use documented::docs_const;
use qstring::QString;
use tracing::info;

use super::{
    handle_sessions::remove_session,
    request::{session_error_response, session_id_or_fail},
};

/// # End Session
/// Ends a session, dropping its working state and history. Requires Authentication.
///
/// Takes in a `session_id`. Afterwards, the id is unknown to all session endpoints.
///
/// If the session id is not given, an UnprocessableEntity response is returned.
///
/// If the session could not be found, a NotFound response is returned.
#[docs_const]
pub async fn end_session(req: HttpRequest) -> impl Responder {
    let qstring = QString::from(req.query_string());
    let headers = req.headers();
    crate::auth::authorize_or_fail!(qstring, headers);

    let session_id = match session_id_or_fail(&qstring, headers) {
        Ok(session_id) => session_id,
        Err(response) => return response,
    };

    match remove_session(&session_id) {
        Ok(()) => {
            info!("Ended session {}.", session_id);
            HttpResponse::Ok().body("Session ended.")
        }
        Err(e) => session_error_response(&e),
    }
}
