use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

/// Matches the first python code block, up to the first closing fence.
static PYTHON_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```python\n(.*?)```").expect("Constant regex failed to compile")
});

/// Extracts the suggested fixed code from the review.
/// Only the first python code block is used, even if the review contains several.
pub fn extract_fixed_code(review: &str) -> Option<String> {
    let Some(captures) = PYTHON_BLOCK.captures(review) else {
        debug!("No python code block found in the review.");
        return None;
    };
    let code = captures.get(1)?.as_str().trim().to_string();
    trace!("Extracted suggested code: {}", code);
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_block_is_extracted() {
        let review = "## Summary\nFine.\n\n## Suggested Fixed Code\n```python\n\ndef add(a, b):\n    return a + b\n\n```\nDone.";
        assert_eq!(
            extract_fixed_code(review),
            Some("def add(a, b):\n    return a + b".to_string())
        );
    }

    #[test]
    fn test_no_block_is_absent() {
        assert_eq!(extract_fixed_code("Looks good, nothing to fix."), None);
        // Untagged blocks don't count.
        assert_eq!(extract_fixed_code("```\nprint(1)\n```"), None);
    }

    #[test]
    fn test_only_first_block_is_used() {
        let review = "```python\nfirst()\n```\ntext\n```python\nsecond()\n```";
        assert_eq!(extract_fixed_code(review), Some("first()".to_string()));
    }

    #[test]
    fn test_unclosed_block_is_absent() {
        assert_eq!(extract_fixed_code("```python\nprint(1)\n"), None);
    }
}
