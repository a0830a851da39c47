//! PEP 508 requirement strings
//!
//! Handles requirement formats:
//! - Plain: `requests`
//! - Versioned: `requests>=2.0,<3`, `requests (>=2.0)`
//! - Extras: `requests[socks,security]>=2`
//! - Markers: `tomli>=1.1; python_version < "3.11"`
//! - Arbitrary equality on non-PEP 440 strings: `foo===1.0-custom`
//!
//! Direct URL references (`name @ https://...`) are rejected.

use super::SyntaxError;
use crate::domain::Constraint;
use pep440_rs::{Operator, Version};
use pep508_rs::{MarkerTree, Requirement, VerbatimUrl, VersionOrUrl};
use regex::Regex;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::LazyLock;

static ARBITRARY_PIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"===\s*([^\s,;()\[\]]+)").expect("Invalid regex"));

/// Stands in for a non-PEP 440 `===` pin while `pep508_rs` parses the line
const PIN_PLACEHOLDER: &str = "0+arbitrary.pin";

static PLACEHOLDER_VERSION: LazyLock<Option<Version>> =
    LazyLock::new(|| Version::from_str(PIN_PLACEHOLDER).ok());

/// A syntactically valid requirement, before marker evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequirement {
    /// PEP 503 normalized name
    pub name: String,
    /// Normalized extras requested on the dependency
    pub extras: BTreeSet<String>,
    pub constraint: Constraint,
    /// `MarkerTree::TRUE` when the requirement has no marker
    pub marker: MarkerTree,
}

/// Swaps `===` pins that are not PEP 440 versions for a placeholder
///
/// Only the part before the marker is touched.
fn extract_pins(input: &str) -> (String, Vec<String>) {
    let (head, marker) = match input.split_once(';') {
        Some((head, marker)) => (head, Some(marker)),
        None => (input, None),
    };

    let mut pins = Vec::new();
    let head = ARBITRARY_PIN_RE.replace_all(head, |caps: &regex::Captures| {
        let value = &caps[1];
        if Version::from_str(value).is_ok() {
            caps[0].to_string()
        } else {
            pins.push(value.to_string());
            format!("==={}", PIN_PLACEHOLDER)
        }
    });

    let text = match marker {
        Some(marker) => format!("{};{}", head, marker),
        None => head.into_owned(),
    };
    (text, pins)
}

/// Parses a single PEP 508 requirement line
pub fn parse_requirement(input: &str) -> Result<ParsedRequirement, SyntaxError> {
    let (text, pins) = extract_pins(input);
    let requirement = Requirement::<VerbatimUrl>::from_str(&text)
        .map_err(|e| SyntaxError::new(input, e.message.to_string()))?;

    let specifiers = match requirement.version_or_url {
        None => Vec::new(),
        Some(VersionOrUrl::VersionSpecifier(specifiers)) => specifiers.into_iter().collect(),
        Some(VersionOrUrl::Url(_)) => {
            return Err(SyntaxError::new(
                input,
                "direct URL references are not supported",
            ))
        }
    };
    let placeholder = PLACEHOLDER_VERSION.as_ref();
    let constraint = Constraint::from_specifiers(specifiers.into_iter().filter(|s| {
        !(*s.operator() == Operator::ExactEqual && Some(s.version()) == placeholder)
    }))
    .with_pins(pins);

    Ok(ParsedRequirement {
        name: requirement.name.to_string(),
        extras: requirement.extras.iter().map(|e| e.to_string()).collect(),
        constraint,
        marker: requirement.marker,
    })
}
