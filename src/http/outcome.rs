//! Result of a helper call that may have answered the request itself.

/// Whether a helper already wrote an error response.
///
/// `Handled` means the status is set and the failure logged: the handler
/// should return the exchange's response immediately.
#[must_use = "a Handled outcome means the error response is already written"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing was written; carry on with the request.
    Continue,
    /// An error status was written and logged; stop processing.
    Handled,
}

impl Outcome {
    pub fn is_handled(self) -> bool {
        self == Outcome::Handled
    }

    pub fn is_continue(self) -> bool {
        self == Outcome::Continue
    }
}
