//! Error types for the retune engine

/// Errors that can occur during construction or per-callback processing.
///
/// The audio thread never fails loudly (see the crate-level docs): a
/// `process` error leaves engine state untouched and degrades to silence
/// being the caller's problem, not a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetuneError {
    /// `fsamp` passed to construction was non-finite, zero, or negative.
    InvalidSampleRate,
    /// `process`'s input/output slices differ in length, or are empty
    /// while `nframes > 0` was implied by the caller.
    BufferSizeMismatch,
    /// A persisted key/value line could not be parsed.
    PersistParse,
}

#[cfg(feature = "std")]
impl std::fmt::Display for RetuneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetuneError::InvalidSampleRate => write!(f, "invalid host sample rate"),
            RetuneError::BufferSizeMismatch => write!(f, "input/output buffer size mismatch"),
            RetuneError::PersistParse => write!(f, "malformed persisted key/value line"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RetuneError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_are_distinct() {
        assert_ne!(RetuneError::InvalidSampleRate, RetuneError::BufferSizeMismatch);
        assert_ne!(RetuneError::BufferSizeMismatch, RetuneError::PersistParse);
    }
}
