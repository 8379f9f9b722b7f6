// For basic authorization and for reading parameters that may come as query or header.

/// The key every request has to carry, read from the environment at startup.
pub static AUTH_KEY: once_cell::sync::OnceCell<String> = once_cell::sync::OnceCell::new();

use actix_web::{http::header::HeaderMap, HttpResponse};
use qstring::QString;
use tracing::{debug, error, trace, warn};

/// Checks the `auth_key` query parameter and the `Authorization: Bearer` header against the key.
/// If both are given and differ, it's enough that one of them matches.
pub fn authorize_or_fail_fn(qstring: &QString, headers: &HeaderMap) -> Result<(), HttpResponse> {
    let Some(auth_key) = AUTH_KEY.get() else {
        error!("No key found in the environment. Sending 500.");
        return Err(HttpResponse::InternalServerError()
            .body("No auth key found in the environment; Authorization failed."));
    };

    let header_token = match headers.get("Authorization") {
        None => None,
        Some(header_val) => {
            let Ok(header_val) = header_val.to_str() else {
                warn!("Authorization header is not a valid UTF-8 string.");
                return Err(HttpResponse::BadRequest()
                    .body("Authorization header is not a valid UTF-8 string."));
            };
            let Some(token) = header_val.strip_prefix("Bearer ") else {
                warn!("Authorization header is not a Bearer token.");
                return Err(HttpResponse::BadRequest().body(
                    "Authorization header is not a Bearer token. Please use the Bearer token format.",
                ));
            };
            Some(token)
        }
    };

    match (qstring.get("auth_key"), header_token) {
        (None, None) => {
            warn!("No key provided in the request.");
            Err(HttpResponse::Unauthorized().body(
                "No key provided in the request. Please set the auth_key in the query parameters or use a Bearer token.",
            ))
        }
        (query_key, header_key) => {
            if query_key == Some(auth_key.as_str()) || header_key == Some(auth_key.as_str()) {
                debug!("Authorized request.");
                Ok(())
            } else {
                warn!("Unauthorized request.");
                Err(HttpResponse::Unauthorized().body("Unauthorized request."))
            }
        }
    }
}

/// Returns the first non-empty value of the given fields, looking at the query string first and then at the headers.
/// Header names are matched case-insensitively, as HTTP requires.
pub fn get_first_matching_field<'a>(
    qstring: &'a QString,
    headers: &'a HeaderMap,
    fields: &[&str],
) -> Option<&'a str> {
    for field in fields {
        if let Some(value) = qstring.get(field).filter(|v| !v.is_empty()) {
            trace!("Found field {} in the query string.", field);
            return Some(value);
        }
        if let Some(value) = headers
            .get(*field)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        {
            trace!("Found field {} in the headers.", field);
            return Some(value);
        }
    }
    None
}

// The authorize_or_fail macro is wrapping the function and return the error variant
// if it fails.
macro_rules! authorize_or_fail {
    ($qstring:expr, $headers:expr) => {
        match $crate::auth::authorize_or_fail_fn(&$qstring, $headers) {
            Ok(()) => (),
            Err(e) => return e,
        }
    };
}

pub(crate) use authorize_or_fail; // Export the macro for use in other modules.
