// Handles the execution request from the client.

use actix_web::{HttpRequest, HttpResponse, Responder};
use documented::docs_const;
use qstring::QString;
use tracing::{debug, warn};

use crate::code_interpreter::{prepare_execution::start_code_interpreter, safety_check::is_blank};

use super::{
    handle_sessions::with_session,
    request::{code_from_request, json_response, session_error_response, session_id_or_fail},
};

/// # Execute
/// Runs Python code on the server and attaches the result to the session's working state. Requires Authentication.
///
/// Takes in a `session_id`. The code is read from the request body, or from the `code` query parameter.
/// If neither is given, the session's current code is run.
///
/// The code runs in the server's own Python interpreter, with no isolation and no timeout.
/// It may be at most 2000 characters long and is checked for syntax errors before it runs.
///
/// Returns the working state as Json (see /state); the result is in `execution_output` (see ExecutionResult below).
/// A failed execution is still a successful request: the error is part of the result.
/// The result is not stored in the history.
///
/// If the session id is not given or the code is blank, an UnprocessableEntity response is returned.
///
/// If the session could not be found, a NotFound response is returned.
#[docs_const]
pub async fn run_code(req: HttpRequest, body: String) -> impl Responder {
    let qstring = QString::from(req.query_string());
    let headers = req.headers();
    crate::auth::authorize_or_fail!(qstring, headers);

    let session_id = match session_id_or_fail(&qstring, headers) {
        Ok(session_id) => session_id,
        Err(response) => return response,
    };

    let code = match code_from_request(&body, &qstring) {
        Some(code) => code,
        None => match with_session(&session_id, |session| session.working.current_code.clone()) {
            Ok(code) => code,
            Err(e) => return session_error_response(&e),
        },
    };
    if is_blank(&code) {
        warn!("The User requested an execution without any code.");
        return HttpResponse::UnprocessableEntity().body("No code to execute");
    }

    // Don't run code for sessions that don't exist.
    if let Err(e) = with_session(&session_id, |_| ()) {
        return session_error_response(&e);
    }

    let result = start_code_interpreter(code.clone()).await;
    debug!(
        "Execution in session {} finished, successful: {}.",
        session_id,
        result.is_success()
    );

    match with_session(&session_id, move |session| {
        session.record_execution(code, result);
        session.working.clone()
    }) {
        Ok(working) => json_response(&working),
        Err(e) => session_error_response(&e),
    }
}
