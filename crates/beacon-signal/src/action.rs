//! Outcomes of subscriber actions.

use std::fmt::Display;

/// What a subscriber action's future resolves to.
///
/// ## Semantics
/// - `into_result()` returns `Ok(())` to keep receiving
/// - `into_result()` returns `Err(reason)` to end this subscriber's receive loop
///
/// Implemented for `()` (infallible actions) and for `Result<(), E>` with any
/// displayable error, so actions can use `?` internally.
pub trait ActionOutcome {
    fn into_result(self) -> Result<(), String>;
}

// Plain actions never end the loop on their own
impl ActionOutcome for () {
    fn into_result(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: Display> ActionOutcome for Result<(), E> {
    fn into_result(self) -> Result<(), String> {
        self.map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_outcome_continues() {
        assert_eq!(().into_result(), Ok(()));
    }

    #[test]
    fn test_result_outcome() {
        let ok: Result<(), &str> = Ok(());
        assert_eq!(ok.into_result(), Ok(()));

        let failed: Result<(), &str> = Err("boom");
        assert_eq!(failed.into_result(), Err("boom".to_string()));
    }
}
