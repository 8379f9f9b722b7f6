use actix_web::{HttpRequest, Responder};
use documented::docs_const;
use qstring::QString;
use tracing::debug;

use super::{
    handle_sessions::with_session,
    request::{json_response, session_error_response, session_id_or_fail},
};

/// # Get State
/// Returns the working state of a session as Json. Requires Authentication.
///
/// Takes in a `session_id`.
///
/// The working state is `{"current_code": String, "current_review": Optional{String}, "execution_output": Optional{ExecutionResult}, "suggested_code": Optional{String}, "selected_submission": Optional{Integer}}`.
/// All other session endpoints answer with the same Json.
///
/// If the session id is not given, an UnprocessableEntity response is returned.
///
/// If the session could not be found, a NotFound response is returned.
#[docs_const]
pub async fn get_state(req: HttpRequest) -> impl Responder {
    let qstring = QString::from(req.query_string());
    let headers = req.headers();
    crate::auth::authorize_or_fail!(qstring, headers);

    let session_id = match session_id_or_fail(&qstring, headers) {
        Ok(session_id) => session_id,
        Err(response) => return response,
    };

    debug!("Returning the working state of session {}.", session_id);
    match with_session(&session_id, |session| session.working.clone()) {
        Ok(working) => json_response(&working),
        Err(e) => session_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};

    use super::*;
    use crate::{
        auth::tests::{init_key, TEST_AUTH_KEY},
        session::{handle_sessions::create_session, types::WorkingState},
    };

    #[actix_web::test]
    async fn test_get_state_endpoint() {
        init_key();
        let app = test::init_service(App::new().route("/state", web::get().to(get_state))).await;
        let session_id = create_session().expect("the store is not poisoned");

        let request = test::TestRequest::get()
            .uri(&format!("/state?auth_key={TEST_AUTH_KEY}"))
            .insert_header(("x-session-id", session_id.as_str()))
            .to_request();
        let state: WorkingState = test::call_and_read_body_json(&app, request).await;
        assert_eq!(state, WorkingState::default());

        let unknown = test::TestRequest::get()
            .uri(&format!("/state?auth_key={TEST_AUTH_KEY}&session_id=unknown"))
            .to_request();
        assert_eq!(
            test::call_service(&app, unknown).await.status(),
            StatusCode::NOT_FOUND
        );

        let missing = test::TestRequest::get()
            .uri(&format!("/state?auth_key={TEST_AUTH_KEY}"))
            .to_request();
        assert_eq!(
            test::call_service(&app, missing).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
