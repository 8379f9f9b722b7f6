use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{code_interpreter::types::ExecutionResult, review::generate::GeneratedReview};

/// The format of the timestamps of the submissions, e.g. `14:05 2024-06-01`.
pub const TIMESTAMP_FORMAT: &str = "%H:%M %Y-%m-%d";

/// One completed review: the code that was sent and what came back.
/// Never changed after it was added to the history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub code: String,
    pub review: Option<String>,
    pub timestamp: String,
    pub execution_output: Option<ExecutionResult>,
    pub suggested_code: Option<String>,
}

/// The single slate of code, review and result the client displays.
/// Every action overwrites it; nothing here is versioned.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkingState {
    pub current_code: String,
    pub current_review: Option<String>,
    pub execution_output: Option<ExecutionResult>,
    pub suggested_code: Option<String>,
    /// Index into the history of the submission that was restored last.
    pub selected_submission: Option<usize>,
}

/// What the history listing shows for each submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub index: usize,
    pub timestamp: String,
    pub lines: usize,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found.")]
    NotFound,
    #[error("No suggested fix available.")]
    NoSuggestedFix,
    #[error("There is no submission with index {index}; the history has {len} entries.")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Error locking the session store.")]
    LockPoisoned,
}

/// The state of one user: the working state and the history of reviews.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub working: WorkingState,
    history: Vec<Submission>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[Submission] {
        &self.history
    }

    /// Stores a successful review as a new submission and shows it in the working state.
    /// The execution result in the working state is left as it is.
    /// Returns the index of the new submission.
    pub fn record_review(
        &mut self,
        code: String,
        generated: GeneratedReview,
        timestamp: String,
    ) -> usize {
        let submission = Submission {
            code: code.clone(),
            review: Some(generated.review.clone()),
            timestamp,
            execution_output: None,
            suggested_code: generated.suggested_code.clone(),
        };
        self.history.push(submission);

        self.working.current_code = code;
        self.working.current_review = Some(generated.review);
        self.working.suggested_code = generated.suggested_code;

        let index = self.history.len() - 1;
        // The working state now shows the new submission.
        self.working.selected_submission = Some(index);
        debug!("Recorded review as submission {}.", index);
        index
    }

    /// Attaches an execution result to the working state.
    /// This is not linked to any submission in the history.
    pub fn record_execution(&mut self, code: String, result: ExecutionResult) {
        trace!("Recording execution result: {:?}", result);
        self.working.current_code = code;
        self.working.execution_output = Some(result);
    }

    /// Replaces the working code with the last suggested fix.
    pub fn apply_suggested_fix(&mut self) -> Result<(), SessionError> {
        let Some(suggested) = self.working.suggested_code.clone() else {
            warn!("Tried to apply a suggested fix, but there is none.");
            return Err(SessionError::NoSuggestedFix);
        };
        self.working.current_code = suggested;
        Ok(())
    }

    /// Resets the working state. The history stays.
    pub fn clear(&mut self) {
        self.working = WorkingState::default();
    }

    /// Restores the submission at the given index (in submission order) into the working state.
    pub fn select_submission(&mut self, index: usize) -> Result<(), SessionError> {
        let Some(submission) = self.history.get(index) else {
            warn!("Tried to select submission {} that doesn't exist.", index);
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.history.len(),
            });
        };
        self.working = WorkingState {
            current_code: submission.code.clone(),
            current_review: submission.review.clone(),
            execution_output: submission.execution_output.clone(),
            suggested_code: submission.suggested_code.clone(),
            selected_submission: Some(index),
        };
        Ok(())
    }

    /// The history as it is listed to the user: newest first.
    pub fn history_overview(&self) -> Vec<HistoryEntry> {
        self.history()
            .iter()
            .enumerate()
            .rev()
            .map(|(index, submission)| HistoryEntry {
                index,
                timestamp: submission.timestamp.clone(),
                lines: submission.code.lines().count(),
            })
            .collect()
    }
}

/// The current local time, formatted for a submission.
pub fn submission_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}
