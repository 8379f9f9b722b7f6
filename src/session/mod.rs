use std::{collections::HashMap, sync::Mutex};

use once_cell::sync::Lazy;

use types::Session;

pub mod handle_sessions;
pub mod request;
pub mod types;

// Endpoints
pub mod apply_fix;
pub mod clear_session;
pub mod end_session;
pub mod get_history;
pub mod get_state;
pub mod new_session;
pub mod review_code;
pub mod run_code;
pub mod select_submission;

/// All sessions, keyed by their session id.
/// Sessions only live in memory; restarting the server forgets all of them.
pub static SESSIONS: Lazy<Mutex<HashMap<String, Session>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
