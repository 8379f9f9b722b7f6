use tracing::{debug, warn};

use super::{types::ExecutionError, MAX_CODE_LENGTH};

/// Checks whether the given code is short enough to be executed.
/// The length is counted in characters, not bytes, so non-ASCII code isn't punished.
pub fn check_code_length(code: &str) -> Result<(), ExecutionError> {
    let length = code.chars().count();
    if length > MAX_CODE_LENGTH {
        warn!(
            "Rejecting code with {} characters, the limit is {}.",
            length, MAX_CODE_LENGTH
        );
        return Err(ExecutionError::SizeLimit {
            limit: MAX_CODE_LENGTH,
        });
    }
    debug!("Code length of {} characters is within the limit.", length);
    Ok(())
}

/// Checks whether there is anything to run at all.
pub fn is_blank(code: &str) -> bool {
    code.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_at_the_limit_is_accepted() {
        let code = "a".repeat(MAX_CODE_LENGTH);
        assert!(check_code_length(&code).is_ok());
    }

    #[test]
    fn test_code_over_the_limit_is_rejected() {
        let code = "a".repeat(MAX_CODE_LENGTH + 1);
        let result = check_code_length(&code);
        assert!(matches!(
            result,
            Err(ExecutionError::SizeLimit { limit }) if limit == MAX_CODE_LENGTH
        ));
    }

    #[test]
    fn test_length_counts_characters() {
        // 2000 characters, but far more than 2000 bytes.
        let code = "ß".repeat(MAX_CODE_LENGTH);
        assert!(code.len() > MAX_CODE_LENGTH);
        assert!(check_code_length(&code).is_ok());
    }

    #[test]
    fn test_blank_code() {
        assert!(is_blank(""));
        assert!(is_blank("  \n\t "));
        assert!(!is_blank("print(1)"));
    }
}
