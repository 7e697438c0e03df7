//! Error types for the entity model runtime.
//!
//! Definition-time errors (`UnknownType`, `DuplicateAttribute`, ...) are
//! structural and fatal to building a descriptor; they are raised eagerly,
//! once, when a type or entity is defined. Instance-time errors abort the
//! single offending operation and leave no partially-mutated state.
//!
//! Rule violations are deliberately NOT here: a failed WHERE rule is
//! reported data ([`crate::rules::RuleResult`]), never an error.

use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    // ── Definition time ──────────────────────────────────────────
    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("type already registered: {0}")]
    DuplicateType(String),

    #[error("duplicate attribute `{attribute}` in entity `{entity}`")]
    DuplicateAttribute { entity: String, attribute: String },

    #[error("entity already defined: {0}")]
    DuplicateEntity(String),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("supertype cycle through entity `{0}`")]
    SupertypeCycle(String),

    #[error("rule `{rule}` of entity `{entity}`: {message}")]
    RuleSyntax {
        entity: String,
        rule: String,
        message: String,
    },

    // ── Instance time ────────────────────────────────────────────
    #[error("entity `{entity}` takes {expected} values, got {got}")]
    ArityMismatch {
        entity: String,
        expected: usize,
        got: usize,
    },

    #[error("attribute `{0}` is mandatory and cannot be unset")]
    MissingMandatoryAttribute(String),

    #[error("attribute `{attribute}`: expected {expected}, got {found}")]
    TypeMismatch {
        attribute: String,
        expected: String,
        found: String,
    },

    #[error("no attribute named `{attribute}` on entity `{entity}`")]
    UnknownAttribute { entity: String, attribute: String },
}
