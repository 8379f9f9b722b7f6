// Handles the prompt for the review.

/// The sampling temperature; low, so the reviews stay focused. The output is still not deterministic.
pub const REVIEW_TEMPERATURE: f32 = 0.3;

/// The maximum number of tokens the review may have.
pub const REVIEW_MAX_OUTPUT_TOKENS: u32 = 2000;

/// The part of the prompt before the code.
const PROMPT_HEADER: &str = r"
You are a senior Python developer. Review the following code thoroughly. 
Then suggest fixes for bugs, improvements, and best practices.

Focus on:
- Correctness
- Performance
- Readability
- Security

Return markdown output with clear sections:
1. Summary
2. Issues Found
3. Suggestions
4. Suggested Fixed Code (as a code block)
   
Code:
```python
";

/// Builds the review prompt with the code embedded in a python code block.
pub fn build_review_prompt(code: &str) -> String {
    format!("{PROMPT_HEADER}{code}\n```")
}
