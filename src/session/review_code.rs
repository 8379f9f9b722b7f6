// Handles the review request from the client.

use actix_web::{HttpRequest, HttpResponse, Responder};
use documented::docs_const;
use qstring::QString;
use tracing::{info, warn};

use crate::{
    code_interpreter::safety_check::is_blank,
    review::{
        generate::{generate_code_review, ReviewBackend},
        REVIEW_BACKEND,
    },
};

use super::{
    handle_sessions::with_session,
    request::{code_from_request, json_response, session_error_response, session_id_or_fail},
    types::submission_timestamp,
};

/// # Review
/// Requests a review of Python code and stores it in the session's history. Requires Authentication.
///
/// Takes in a `session_id`. The code is read from the request body, or from the `code` query parameter.
/// If neither is given, the session's current code is reviewed (e.g. after applying a fix).
///
/// The review is a markdown text with the sections Summary, Issues Found, Suggestions and Suggested Fixed Code.
/// If it contains a fenced python code block, that block becomes the suggested fix.
///
/// On success, the review is added to the history and the working state is returned as Json (see /state).
/// The last execution result in the working state is kept.
///
/// If the session id is not given or the code is blank, an UnprocessableEntity response is returned.
///
/// If the session could not be found, a NotFound response is returned.
///
/// If the review could not be generated, a BadGateway response is returned and the session is left unchanged.
/// Nothing is retried.
#[docs_const]
pub async fn review_code(req: HttpRequest, body: String) -> impl Responder {
    let qstring = QString::from(req.query_string());
    let headers = req.headers();
    crate::auth::authorize_or_fail!(qstring, headers);

    let session_id = match session_id_or_fail(&qstring, headers) {
        Ok(session_id) => session_id,
        Err(response) => return response,
    };
    let code = code_from_request(&body, &qstring);

    let backend = REVIEW_BACKEND
        .as_ref()
        .map(|backend| backend as &dyn ReviewBackend);
    review_in_session(&session_id, code, backend).await
}

/// Reviews the code (or the session's current code) and records the review in the session.
/// The session isn't locked while the review is generated.
pub async fn review_in_session(
    session_id: &str,
    code: Option<String>,
    backend: Option<&dyn ReviewBackend>,
) -> HttpResponse {
    let code = match code {
        Some(code) => code,
        None => match with_session(session_id, |session| session.working.current_code.clone()) {
            Ok(code) => code,
            Err(e) => return session_error_response(&e),
        },
    };
    if is_blank(&code) {
        warn!("The User requested a review without any code.");
        return HttpResponse::UnprocessableEntity().body("Please enter code first");
    }

    // Fail early for unknown sessions, before spending a request on the review.
    if let Err(e) = with_session(session_id, |_| ()) {
        return session_error_response(&e);
    }

    let generated = match generate_code_review(backend, &code).await {
        Ok(generated) => generated,
        Err(e) => {
            warn!("Could not generate a review: {}", e);
            return HttpResponse::BadGateway().body(format!("Review generation failed: {e}"));
        }
    };

    let timestamp = submission_timestamp();
    match with_session(session_id, move |session| {
        let index = session.record_review(code, generated, timestamp);
        info!("Stored review as submission {} of session {}.", index, session_id);
        session.working.clone()
    }) {
        Ok(working) => json_response(&working),
        Err(e) => session_error_response(&e),
    }
}
