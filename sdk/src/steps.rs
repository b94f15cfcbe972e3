//! Cancellation step normalization
//!
//! Language models rarely return exactly the list we ask for. This module turns
//! a free-text completion into a fixed list of ten instructions:
//!
//! 1. Lines that start with an ordinal (`<digits>.<whitespace>`) win. Their
//!    content, with the ordinal stripped, becomes the candidate list in
//!    document order. Unnumbered lines are dropped in this mode.
//! 2. If no line is numbered, every non-blank line is a candidate, verbatim.
//! 3. The candidates are truncated to ten, then padded with filler entries.
//!
//! Normalization never fails; the empty string yields ten filler entries.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Index;
use std::sync::OnceLock;

/// Number of steps in every normalized list
pub const STEP_COUNT: usize = 10;

static ORDINAL_PATTERN: OnceLock<Regex> = OnceLock::new();

/// `<optional whitespace><digits>.<whitespace><content>`
fn ordinal_pattern() -> &'static Regex {
    ORDINAL_PATTERN
        .get_or_init(|| Regex::new(r"^\s*[0-9]+\.\s+(.*)$").expect("Invalid ordinal pattern"))
}

/// Placeholder text used for position `n` (1-based) when the completion
/// produced fewer than ten steps.
pub fn filler_step(n: usize) -> String {
    format!(
        "Step {}: Continue following any on-screen instructions to complete the cancellation process.",
        n
    )
}

/// An ordered list of exactly [`STEP_COUNT`] cancellation instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CancellationSteps(Vec<String>);

impl CancellationSteps {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Number of entries that are filler rather than extracted text
    pub fn filler_count(&self) -> usize {
        self.0
            .iter()
            .enumerate()
            .filter(|(i, step)| **step == filler_step(i + 1))
            .count()
    }
}

impl Index<usize> for CancellationSteps {
    type Output = String;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl TryFrom<Vec<String>> for CancellationSteps {
    type Error = String;

    fn try_from(steps: Vec<String>) -> Result<Self, Self::Error> {
        if steps.len() != STEP_COUNT {
            return Err(format!(
                "expected {} cancellation steps, got {}",
                STEP_COUNT,
                steps.len()
            ));
        }
        Ok(Self(steps))
    }
}

impl From<CancellationSteps> for Vec<String> {
    fn from(steps: CancellationSteps) -> Self {
        steps.0
    }
}

impl<'a> IntoIterator for &'a CancellationSteps {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Normalize a completion into exactly ten cancellation steps.
pub fn normalize(raw_text: &str) -> CancellationSteps {
    let lines: Vec<&str> = raw_text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();

    let pattern = ordinal_pattern();
    let numbered: Vec<String> = lines
        .iter()
        .filter_map(|line| pattern.captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect();

    let mut steps = if numbered.is_empty() {
        lines.into_iter().map(str::to_string).collect()
    } else {
        numbered
    };

    steps.truncate(STEP_COUNT);
    while steps.len() < STEP_COUNT {
        steps.push(filler_step(steps.len() + 1));
    }

    CancellationSteps(steps)
}
