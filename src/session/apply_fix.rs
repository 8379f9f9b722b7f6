use actix_web::{HttpRequest, Responder};
use documented::docs_const;
use qstring::QString;
use tracing::info;

use super::{
    handle_sessions::with_session,
    request::{json_response, session_error_response, session_id_or_fail},
};

/// # Apply Fix
/// Replaces the session's current code with the fix suggested by the last review. Requires Authentication.
///
/// Takes in a `session_id`.
///
/// Returns the working state as Json (see /state).
///
/// If the session id is not given, an UnprocessableEntity response is returned.
///
/// If the session could not be found, a NotFound response is returned.
///
/// If there is no suggested fix, a Conflict response is returned and nothing changes.
#[docs_const]
pub async fn apply_fix(req: HttpRequest) -> impl Responder {
    let qstring = QString::from(req.query_string());
    let headers = req.headers();
    crate::auth::authorize_or_fail!(qstring, headers);

    let session_id = match session_id_or_fail(&qstring, headers) {
        Ok(session_id) => session_id,
        Err(response) => return response,
    };

    let result = with_session(&session_id, |session| {
        session
            .apply_suggested_fix()
            .map(|()| session.working.clone())
    });
    match result {
        Ok(Ok(working)) => {
            info!("Applied the suggested fix in session {}.", session_id);
            json_response(&working)
        }
        Ok(Err(e)) | Err(e) => session_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};

    use super::*;
    use crate::{
        auth::tests::{init_key, TEST_AUTH_KEY},
        review::generate::GeneratedReview,
        session::{handle_sessions::create_session, types::WorkingState},
    };

    #[actix_web::test]
    async fn test_apply_fix_endpoint() {
        init_key();
        let app = test::init_service(App::new().route("/applyfix", web::post().to(apply_fix))).await;
        let session_id = create_session().expect("the store is not poisoned");
        let uri = format!("/applyfix?auth_key={TEST_AUTH_KEY}&session_id={session_id}");

        let request = test::TestRequest::post().uri(&uri).to_request();
        assert_eq!(
            test::call_service(&app, request).await.status(),
            StatusCode::CONFLICT
        );

        with_session(&session_id, |session| {
            session.record_review(
                "prin(1)".to_string(),
                GeneratedReview {
                    review: "Typo.".to_string(),
                    suggested_code: Some("print(1)".to_string()),
                },
                "10:00 2024-01-01".to_string(),
            );
        })
        .expect("the session exists");

        let request = test::TestRequest::post().uri(&uri).to_request();
        let state: WorkingState = test::call_and_read_body_json(&app, request).await;
        assert_eq!(state.current_code, "print(1)");
    }
}
