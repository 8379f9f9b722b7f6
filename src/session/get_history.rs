use actix_web::{HttpRequest, Responder};
use documented::docs_const;
use qstring::QString;
use tracing::trace;

use super::{
    handle_sessions::with_session,
    request::{json_response, session_error_response, session_id_or_fail},
};

/// # Get History
/// Returns the reviews of a session as a Json List, newest first. Requires Authentication.
///
/// Takes in a `session_id`.
///
/// Each entry is `{"index": Integer, "timestamp": String, "lines": Integer}`.
/// The index counts in the order the reviews were made, starting at 0, and is what /selecthistory takes.
/// The timestamp is the local time of the review as `HH:MM YYYY-MM-DD`; lines is the line count of the reviewed code.
///
/// If the session id is not given, an UnprocessableEntity response is returned.
///
/// If the session could not be found, a NotFound response is returned.
#[docs_const]
pub async fn get_history(req: HttpRequest) -> impl Responder {
    let qstring = QString::from(req.query_string());
    let headers = req.headers();
    crate::auth::authorize_or_fail!(qstring, headers);

    let session_id = match session_id_or_fail(&qstring, headers) {
        Ok(session_id) => session_id,
        Err(response) => return response,
    };

    trace!("Listing the history of session {}.", session_id);
    match with_session(&session_id, |session| session.history_overview()) {
        Ok(overview) => json_response(&overview),
        Err(e) => session_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{test, web, App};

    use super::*;
    use crate::{
        auth::tests::{init_key, TEST_AUTH_KEY},
        review::generate::GeneratedReview,
        session::{handle_sessions::create_session, types::HistoryEntry},
    };

    #[actix_web::test]
    async fn test_history_endpoint() {
        init_key();
        let app =
            test::init_service(App::new().route("/history", web::get().to(get_history))).await;
        let session_id = create_session().expect("the store is not poisoned");
        with_session(&session_id, |session| {
            for (code, timestamp) in [("a = 1", "10:00 2024-01-01"), ("b = 1\nc = 2\n", "10:01 2024-01-01")] {
                session.record_review(
                    code.to_string(),
                    GeneratedReview {
                        review: "Fine.".to_string(),
                        suggested_code: None,
                    },
                    timestamp.to_string(),
                );
            }
        })
        .expect("the session exists");

        let request = test::TestRequest::get()
            .uri(&format!(
                "/history?auth_key={TEST_AUTH_KEY}&session_id={session_id}"
            ))
            .to_request();
        let history: Vec<HistoryEntry> = test::call_and_read_body_json(&app, request).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].index, 1);
        assert_eq!(history[0].lines, 2);
        assert_eq!(history[1].index, 0);
        assert_eq!(history[1].timestamp, "10:00 2024-01-01");
    }
}
