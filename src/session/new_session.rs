use actix_web::{HttpRequest, Responder};
use documented::docs_const;
use qstring::QString;
use serde::Serialize;
use tracing::info;

use super::{
    handle_sessions::create_session,
    request::{json_response, session_error_response},
};

#[derive(Debug, Serialize)]
struct NewSessionResponse {
    session_id: String,
}

/// # New Session
/// Creates a new, empty session and returns its id as Json `{"session_id": String}`. Requires Authentication.
///
/// The session id has to be passed to all other session endpoints, either as the `session_id` query parameter or as the `x-session-id` header.
///
/// Sessions only live in memory; they are lost when the server restarts.
///
/// If the session could not be created, an InternalServerError response is returned.
#[docs_const]
pub async fn new_session(req: HttpRequest) -> impl Responder {
    let qstring = QString::from(req.query_string());
    crate::auth::authorize_or_fail!(qstring, req.headers());

    match create_session() {
        Ok(session_id) => {
            info!("Created a new session.");
            json_response(&NewSessionResponse { session_id })
        }
        Err(e) => session_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, web, App};

    use super::*;
    use crate::auth::tests::{init_key, TEST_AUTH_KEY};

    #[actix_web::test]
    async fn test_new_session_endpoint() {
        init_key();
        let app =
            test::init_service(App::new().route("/newsession", web::post().to(new_session))).await;

        let request = test::TestRequest::post()
            .uri(&format!("/newsession?auth_key={TEST_AUTH_KEY}"))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;
        let session_id = body["session_id"].as_str().expect("the id is a string");
        assert_eq!(session_id.len(), 32);

        let unauthorized = test::TestRequest::post().uri("/newsession").to_request();
        let response = test::call_service(&app, unauthorized).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
