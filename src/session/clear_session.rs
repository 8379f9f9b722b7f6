use actix_web::{HttpRequest, Responder};
use documented::docs_const;
use qstring::QString;
use tracing::debug;

use super::{
    handle_sessions::with_session,
    request::{json_response, session_error_response, session_id_or_fail},
};

/// # Clear
/// Resets the working state of a session: code, review, execution result, suggested fix and selection. Requires Authentication.
///
/// Takes in a `session_id`. The history is kept.
///
/// Returns the (now empty) working state as Json (see /state).
///
/// If the session id is not given, an UnprocessableEntity response is returned.
///
/// If the session could not be found, a NotFound response is returned.
#[docs_const]
pub async fn clear_session(req: HttpRequest) -> impl Responder {
    let qstring = QString::from(req.query_string());
    let headers = req.headers();
    crate::auth::authorize_or_fail!(qstring, headers);

    let session_id = match session_id_or_fail(&qstring, headers) {
        Ok(session_id) => session_id,
        Err(response) => return response,
    };

    debug!("Clearing the working state of session {}.", session_id);
    match with_session(&session_id, |session| {
        session.clear();
        session.working.clone()
    }) {
        Ok(working) => json_response(&working),
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
        session::{handle_sessions::create_session, types::WorkingState},
    };

    #[actix_web::test]
    async fn test_clear_endpoint() {
        init_key();
        let app =
            test::init_service(App::new().route("/clear", web::post().to(clear_session))).await;
        let session_id = create_session().expect("the store is not poisoned");
        with_session(&session_id, |session| {
            session.record_review(
                "x = 1".to_string(),
                GeneratedReview {
                    review: "Fine.".to_string(),
                    suggested_code: None,
                },
                "10:00 2024-01-01".to_string(),
            );
        })
        .expect("the session exists");

        let request = test::TestRequest::post()
            .uri(&format!(
                "/clear?auth_key={TEST_AUTH_KEY}&session_id={session_id}"
            ))
            .to_request();
        let state: WorkingState = test::call_and_read_body_json(&app, request).await;
        assert_eq!(state, WorkingState::default());

        let history_len = with_session(&session_id, |session| session.history().len())
            .expect("the session exists");
        assert_eq!(history_len, 1);
    }
}
