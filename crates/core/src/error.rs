//! Structured errors for registry input validation.
//!
//! Business-condition failures (release by non-owner, unknown path, etc.)
//! are reported as plain `bool`/`Option` per SPEC_FULL.md §4.4 — they are not
//! errors, they are documented outcomes. `RegistryError` is reserved for
//! malformed input that the request surface must reject before it ever
//! reaches a Registry method.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid type: must be file, directory, or process")]
    InvalidResourceKind,

    #[error("path must not be empty")]
    EmptyPath,

    #[error("ttl_seconds must not be negative")]
    NegativeTtl,

    #[error("Sub-agents require both spawn_call_id and parent_agent_id")]
    IncompleteSubAgent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_spec_wording() {
        assert_eq!(
            RegistryError::InvalidResourceKind.to_string(),
            "Invalid type: must be file, directory, or process"
        );
        assert_eq!(
            RegistryError::IncompleteSubAgent.to_string(),
            "Sub-agents require both spawn_call_id and parent_agent_id"
        );
    }
}
