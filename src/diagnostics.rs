//! Structured reporting of degraded or skipped input.
//!
//! Nothing in the reconstruction path fails the run for a single bad row or a
//! single unpriced asset. Those problems are recorded here instead, handed back
//! to the caller next to the best-effort result, and logged as they happen.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One degraded, skipped or assumed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Issue {
    /// A numeric field could not be parsed and was coerced to unknown.
    MalformedField {
        line: usize,
        field: String,
        raw: String,
    },
    /// A row was dropped entirely (e.g. unparsable timestamp).
    DroppedRow { line: usize, reason: String },
    /// A zero-value noise posting was filtered before classification.
    NoiseFiltered { line: usize },
    /// A traded product has no ticker mapping; it contributes zero value.
    MissingMapping { product: String },
    /// No usable price series for a mapped product.
    MissingMarketData {
        product: String,
        symbol: String,
        reason: String,
    },
    /// The FX series had no sample for some timestamps; the fallback rate was used.
    FxFallback { timestamp_count: usize, rate: Decimal },
    /// A foreign trade had no conversion leg, ledger rate or FX sample and was
    /// priced at the fallback rate.
    TradeFxFallback { line: usize, rate: Decimal },
    /// A held product had no price sample at or before some timestamps.
    UnpricedPoints { product: String, count: usize },
    /// A documented interpretation of ambiguous ledger semantics was applied.
    LedgerAssumption { note: String },
}

impl Issue {
    /// Ledger line of a row that was coerced or dropped while loading.
    pub fn malformed_line(&self) -> Option<usize> {
        match self {
            Issue::MalformedField { line, .. } | Issue::DroppedRow { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Collector passed explicitly into the loading and valuation stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    issues: Vec<Issue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, issue: Issue) {
        match &issue {
            Issue::MalformedField { line, field, raw } => {
                warn!(line, field = %field, raw = %raw, "unparsable field coerced to unknown");
            }
            Issue::DroppedRow { line, reason } => {
                warn!(line, reason = %reason, "ledger row dropped");
            }
            Issue::NoiseFiltered { line } => {
                tracing::debug!(line, "zero-value noise row filtered");
            }
            Issue::MissingMapping { product } => {
                warn!(product = %product, "no ticker mapping, valued at zero");
            }
            Issue::MissingMarketData {
                product,
                symbol,
                reason,
            } => {
                warn!(product = %product, symbol = %symbol, reason = %reason, "no market data, valued at zero");
            }
            Issue::FxFallback {
                timestamp_count,
                rate,
            } => {
                warn!(timestamp_count, rate = %rate, "FX series unavailable, using fallback rate (degraded precision)");
            }
            Issue::TradeFxFallback { line, rate } => {
                warn!(line, rate = %rate, "foreign trade priced at fallback rate (degraded precision)");
            }
            Issue::UnpricedPoints { product, count } => {
                warn!(product = %product, count, "no price sample at or before some timestamps");
            }
            Issue::LedgerAssumption { note } => {
                warn!(note = %note, "ledger assumption applied");
            }
        }
        self.issues.push(issue);
    }

    /// Record an issue only if an equal one is not already present.
    pub fn record_once(&mut self, issue: Issue) {
        if !self.issues.contains(&issue) {
            self.record(issue);
        }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of distinct ledger lines that were coerced or dropped.
    pub fn malformed_row_count(&self) -> usize {
        let mut lines: Vec<usize> = self
            .issues
            .iter()
            .filter_map(Issue::malformed_line)
            .collect();
        lines.sort_unstable();
        lines.dedup();
        lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_row_count_counts_lines_once() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record(Issue::MalformedField {
            line: 3,
            field: "amount".to_string(),
            raw: "abc".to_string(),
        });
        diagnostics.record(Issue::MalformedField {
            line: 3,
            field: "balance".to_string(),
            raw: "".to_string(),
        });
        diagnostics.record(Issue::DroppedRow {
            line: 7,
            reason: "bad date".to_string(),
        });
        diagnostics.record(Issue::MissingMapping {
            product: "ACME".to_string(),
        });

        assert_eq!(diagnostics.issues().len(), 4);
        assert_eq!(diagnostics.malformed_row_count(), 2);
    }

    #[test]
    fn record_once_skips_duplicates() {
        let mut diagnostics = Diagnostics::new();
        let issue = Issue::MissingMapping {
            product: "ACME".to_string(),
        };
        diagnostics.record_once(issue.clone());
        diagnostics.record_once(issue);
        assert_eq!(diagnostics.issues().len(), 1);
    }

    #[test]
    fn issue_serializes_with_type_tag() {
        let issue = Issue::NoiseFiltered { line: 4 };
        let json = serde_json::to_string(&issue).unwrap();
        assert_eq!(json, r#"{"type":"noise_filtered","line":4}"#);
    }
}
