//! Terminal signals ending a subscription's active lifetime.

/// The signal a producer delivers at most once to end a subscription:
/// normal completion, or a failure carrying an opaque producer-defined
/// error payload that this crate never interprets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminal<E> {
    /// The source is exhausted; no further values will be produced.
    Completed,
    /// The source failed with the producer's error payload.
    Failed(E),
}

impl<E> Terminal<E> {
    /// Returns `true` for normal completion.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Terminal::Completed)
    }

    /// Returns `true` for a failure signal.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Terminal::Failed(_))
    }

    /// Returns the error payload of a failure signal.
    #[must_use]
    pub fn error(&self) -> Option<&E> {
        match self {
            Terminal::Failed(error) => Some(error),
            Terminal::Completed => None,
        }
    }

    /// Consumes the signal and returns the error payload, if any.
    #[must_use]
    pub fn into_error(self) -> Option<E> {
        match self {
            Terminal::Failed(error) => Some(error),
            Terminal::Completed => None,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_completed() {
        let terminal: Terminal<String> = Terminal::Completed;
        assert!(terminal.is_completed());
        assert!(!terminal.is_failed());
        assert_eq!(terminal.error(), None);
        assert_eq!(terminal.into_error(), None);
    }

    #[test]
    fn test_terminal_failed() {
        let terminal = Terminal::Failed("boom");
        assert!(terminal.is_failed());
        assert!(!terminal.is_completed());
        assert_eq!(terminal.error(), Some(&"boom"));
        assert_eq!(terminal.into_error(), Some("boom"));
    }
}
