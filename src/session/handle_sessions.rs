use rand::{distr::Alphanumeric, Rng};
use tracing::{debug, error, trace, warn};

use super::{
    types::{Session, SessionError},
    SESSIONS,
};

/// Length of the generated session ids.
pub const SESSION_ID_LENGTH: usize = 32;

/// Returns a random id that no session uses yet.
pub fn new_session_id() -> String {
    trace!("Generating new session ID.");
    loop {
        let value: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LENGTH)
            .map(char::from)
            .collect();

        match SESSIONS.lock() {
            Ok(guard) => {
                if guard.contains_key(&value) {
                    warn!("Generated session ID is already in use, trying again.");
                    continue;
                }
                return value;
            }
            Err(e) => {
                error!(
                    "Error locking the mutex, falling back to hoping the value is unique: {:?}",
                    e
                );
                return value;
            }
        }
    }
}

/// Creates a new, empty session and returns its id.
pub fn create_session() -> Result<String, SessionError> {
    let session_id = new_session_id();
    match SESSIONS.lock() {
        Ok(mut guard) => {
            guard.insert(session_id.clone(), Session::new());
            debug!(
                "Created session {}, there are now {} sessions.",
                session_id,
                guard.len()
            );
            Ok(session_id)
        }
        Err(e) => {
            error!("Error locking the mutex: {:?}", e);
            Err(SessionError::LockPoisoned)
        }
    }
}

/// Runs the given function on the session with the given id.
/// The store is locked while the function runs, so it must not block.
pub fn with_session<R>(
    session_id: &str,
    f: impl FnOnce(&mut Session) -> R,
) -> Result<R, SessionError> {
    trace!("Accessing session with id: {}", session_id);
    match SESSIONS.lock() {
        Ok(mut guard) => match guard.get_mut(session_id) {
            Some(session) => Ok(f(session)),
            None => {
                warn!("Session with id: {} not found.", session_id);
                Err(SessionError::NotFound)
            }
        },
        Err(e) => {
            error!("Error locking the mutex: {:?}", e);
            Err(SessionError::LockPoisoned)
        }
    }
}

/// Removes the session with the given id, forgetting its working state and history.
pub fn remove_session(session_id: &str) -> Result<(), SessionError> {
    trace!("Ending session with id: {}", session_id);
    match SESSIONS.lock() {
        Ok(mut guard) => match guard.remove(session_id) {
            Some(_) => {
                debug!(
                    "Removed session {}, there are now {} sessions.",
                    session_id,
                    guard.len()
                );
                Ok(())
            }
            None => {
                warn!("Session with id: {} not found.", session_id);
                Err(SessionError::NotFound)
            }
        },
        Err(e) => {
            error!("Error locking the mutex: {:?}", e);
            Err(SessionError::LockPoisoned)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_id_shape() {
        let id = new_session_id();
        assert_eq!(id.len(), SESSION_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_sessions_are_independent() {
        let first = create_session().expect("the store is not poisoned");
        let second = create_session().expect("the store is not poisoned");
        assert_ne!(first, second);

        with_session(&first, |session| {
            session.working.current_code = "only in first".to_string();
        })
        .expect("the session was just created");

        let second_code = with_session(&second, |session| session.working.current_code.clone())
            .expect("the session was just created");
        assert_eq!(second_code, "");
    }

    #[test]
    fn test_unknown_session() {
        let result = with_session("does-not-exist", |_| ());
        assert_eq!(result, Err(SessionError::NotFound));
    }

    #[test]
    fn test_removed_session_is_gone() {
        let session_id = create_session().expect("the store is not poisoned");
        assert_eq!(remove_session(&session_id), Ok(()));
        assert_eq!(
            with_session(&session_id, |_| ()),
            Err(SessionError::NotFound)
        );
        assert_eq!(remove_session(&session_id), Err(SessionError::NotFound));
    }
}
