//! Input validation for append batches.

use crate::error::CoreError;
use crate::types::Character;

/// Default upper bound on events accepted in a single append.
pub const DEFAULT_MAX_EVENTS_PER_APPEND: usize = 10_000;

/// Parse a batch of submitted characters, rejecting the whole batch on the
/// first invalid entry or when it exceeds `max`.
pub fn parse_batch<S: AsRef<str>>(raw: &[S], max: usize) -> Result<Vec<Character>, CoreError> {
    validate_batch_len(raw.len(), max)?;
    raw.iter()
        .enumerate()
        .map(|(i, s)| {
            Character::parse(s.as_ref())
                .map_err(|e| CoreError::InvalidCharacter(format!("event {}: {}", i, e)))
        })
        .collect()
}

/// Check a batch length against the configured limit.
pub fn validate_batch_len(len: usize, max: usize) -> Result<(), CoreError> {
    if len > max {
        return Err(CoreError::BatchTooLarge { got: len, max });
    }
    Ok(())
}
