//! Rendering of outcomes and contract tables.

use std::fmt::Write;

use crate::error::EncodingError;
use crate::probe::ValidationOutcome;
use crate::schema::ContractTable;

/// One line per outcome.
pub fn render_text(outcomes: &[ValidationOutcome]) -> String {
    let mut out = String::new();
    for outcome in outcomes {
        match (outcome.error(), outcome.encoded_len()) {
            (None, len) => {
                let _ = writeln!(
                    out,
                    "accepted  {} ({} bytes)",
                    outcome.variant(),
                    len.unwrap_or_default()
                );
            }
            (Some(error), _) => {
                let cause = error.root_cause();
                let _ = writeln!(
                    out,
                    "rejected  {}: {} at {}: {}",
                    outcome.variant(),
                    cause.reason(),
                    cause.path(),
                    describe(error)
                );
            }
        }
    }
    out
}

/// `error` as a chain of paths, outermost first.
fn describe(error: &EncodingError) -> String {
    match error {
        EncodingError::NestedFailure { path, source } => format!("in {path}, {}", describe(source)),
        leaf => leaf.to_string(),
    }
}

/// Pretty-printed JSON array of outcomes.
pub fn render_json(outcomes: &[ValidationOutcome]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(outcomes)
}

/// One line per field contract: path and accepted representations.
pub fn render_contracts(contracts: &ContractTable) -> String {
    let width = contracts
        .iter()
        .map(|c| c.path().len())
        .max()
        .unwrap_or_default();
    let mut out = String::new();
    for contract in contracts.iter() {
        let accepted: Vec<String> = contract.accepted().iter().map(ToString::to_string).collect();
        let _ = writeln!(
            out,
            "{:width$}  {}",
            contract.path(),
            if accepted.is_empty() {
                "-".to_string()
            } else {
                accepted.join(" | ")
            }
        );
    }
    out
}
