//! Parsers for PyPI metadata syntax
//!
//! PEP 508 requirement strings (`Requires-Dist`, `build-system.requires`)
//! are parsed with `pep508_rs`; markers stay `MarkerTree`s until
//! normalization evaluates them.

mod requirement;

pub use requirement::{parse_requirement, ParsedRequirement};

use thiserror::Error;

/// Input that does not follow the expected grammar
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse '{input}': {message}")]
pub struct SyntaxError {
    pub input: String,
    pub message: String,
}

impl SyntaxError {
    pub fn new(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }
}
