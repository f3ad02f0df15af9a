//! Best-so-far reduction of run outcomes per shape.

use crate::logparse::{IncompleteReason, PerformanceRecord, RunOutcome};
use serde::Serialize;
use smmtune_kernels::Shape;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    MissingLog,
    IncompleteLog { reason: IncompleteReason },
    FailedRun { errors: u64 },
}

/// Why a shape has no usable winner (yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    #[serde(flatten)]
    pub kind: DiagnosticKind,
    pub source: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, source: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiagnosticKind::MissingLog => write!(f, "log missing: {}", self.source),
            DiagnosticKind::IncompleteLog { reason } => {
                write!(f, "log incomplete ({}): {}", reason, self.source)
            }
            DiagnosticKind::FailedRun { errors } => write!(f, "{} errors: {}", errors, self.source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WinnerEntry {
    Diagnostic(Diagnostic),
    Winner {
        record: PerformanceRecord,
        source: String,
    },
}

impl WinnerEntry {
    pub fn record(&self) -> Option<&PerformanceRecord> {
        match self {
            WinnerEntry::Winner { record, .. } => Some(record),
            WinnerEntry::Diagnostic(_) => None,
        }
    }

    pub fn throughput(&self) -> Option<f64> {
        self.record().map(|record| record.throughput)
    }
}

/// What a single [`WinnerTable::update`] did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateEffect {
    /// First winner for the shape.
    Created,
    /// Replaced a slower winner.
    Improved,
    /// Not faster than the current winner.
    Kept,
    /// Recorded a diagnostic.
    Diagnosed,
    /// Diagnostic dropped because the shape already has a winner.
    Ignored,
}

/// Current best entry per shape, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct WinnerTable {
    order: Vec<Shape>,
    entries: HashMap<Shape, WinnerEntry>,
}

impl WinnerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one run's outcome into the entry for `shape`.
    ///
    /// Winners only ever get replaced by strictly faster records, and
    /// diagnostics never replace a winner.
    pub fn update(&mut self, shape: Shape, outcome: RunOutcome, source: &str) -> UpdateEffect {
        let kind = match outcome {
            RunOutcome::Succeeded(record) => return self.offer(shape, record, source),
            RunOutcome::Missing => DiagnosticKind::MissingLog,
            RunOutcome::Incomplete(reason) => DiagnosticKind::IncompleteLog { reason },
            RunOutcome::Failed(errors) => DiagnosticKind::FailedRun { errors },
        };
        self.diagnose(shape, Diagnostic::new(kind, source))
    }

    /// Folds every entry of `other` into this table with the same rules as [`update`].
    ///
    /// [`update`]: WinnerTable::update
    pub fn merge(&mut self, mut other: WinnerTable) {
        for shape in other.order {
            match other.entries.remove(&shape) {
                Some(WinnerEntry::Winner { record, source }) => {
                    self.offer(shape, record, &source);
                }
                Some(WinnerEntry::Diagnostic(diagnostic)) => {
                    self.diagnose(shape, diagnostic);
                }
                None => {}
            }
        }
    }

    pub fn get(&self, shape: &Shape) -> Option<&WinnerEntry> {
        self.entries.get(shape)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Shape, &WinnerEntry)> {
        self.order
            .iter()
            .filter_map(|shape| self.entries.get(shape).map(|entry| (*shape, entry)))
    }

    pub fn winners(&self) -> impl Iterator<Item = (Shape, &PerformanceRecord)> {
        self.iter()
            .filter_map(|(shape, entry)| entry.record().map(|record| (shape, record)))
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = (Shape, &Diagnostic)> {
        self.iter().filter_map(|(shape, entry)| match entry {
            WinnerEntry::Diagnostic(diagnostic) => Some((shape, diagnostic)),
            WinnerEntry::Winner { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn offer(&mut self, shape: Shape, record: PerformanceRecord, source: &str) -> UpdateEffect {
        // Absent entries and diagnostics rank below any measured throughput.
        let effect = match self.entries.get(&shape).and_then(WinnerEntry::throughput) {
            Some(best) if record.throughput <= best => return UpdateEffect::Kept,
            Some(_) => UpdateEffect::Improved,
            None => UpdateEffect::Created,
        };
        debug!(
            shape = %shape,
            throughput = record.throughput,
            source,
            "new winner"
        );
        self.insert(
            shape,
            WinnerEntry::Winner {
                record,
                source: source.to_string(),
            },
        );
        effect
    }

    fn diagnose(&mut self, shape: Shape, diagnostic: Diagnostic) -> UpdateEffect {
        if let Some(WinnerEntry::Winner { .. }) = self.entries.get(&shape) {
            return UpdateEffect::Ignored;
        }
        self.insert(shape, WinnerEntry::Diagnostic(diagnostic));
        UpdateEffect::Diagnosed
    }

    fn insert(&mut self, shape: Shape, entry: WinnerEntry) {
        if self.entries.insert(shape, entry).is_none() {
            self.order.push(shape);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn success(throughput: f64) -> RunOutcome {
        RunOutcome::Succeeded(PerformanceRecord {
            text: format!("Kernel_dnt_tiny(m=1, n=1, k=1) , # {:.1} GFlop/s", throughput),
            throughput,
        })
    }

    fn best(table: &WinnerTable, shape: Shape) -> Option<f64> {
        table.get(&shape).and_then(WinnerEntry::throughput)
    }

    #[test]
    fn test_strict_improvement_in_either_order() {
        let shape = Shape::new(32, 32, 32);
        for (first, second) in [(80.0, 95.3), (95.3, 80.0)] {
            let mut table = WinnerTable::new();
            table.update(shape, success(first), "run1.log");
            table.update(shape, success(second), "run2.log");
            assert_eq!(best(&table, shape), Some(95.3));
            assert_eq!(table.len(), 1);
        }
    }

    #[test]
    fn test_tie_keeps_first_winner() {
        let shape = Shape::new(4, 4, 4);
        let mut table = WinnerTable::new();
        assert_eq!(table.update(shape, success(10.0), "a.log"), UpdateEffect::Created);
        assert_eq!(table.update(shape, success(10.0), "b.log"), UpdateEffect::Kept);
        match table.get(&shape) {
            Some(WinnerEntry::Winner { source, .. }) => assert_eq!(source, "a.log"),
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_diagnostics_never_clobber_winner() {
        let shape = Shape::new(4, 4, 4);
        let mut table = WinnerTable::new();
        table.update(shape, success(10.0), "a.log");
        assert_eq!(table.update(shape, RunOutcome::Failed(3), "b.log"), UpdateEffect::Ignored);
        assert_eq!(
            table.update(shape, RunOutcome::Incomplete(IncompleteReason::NoWinner), "c.log"),
            UpdateEffect::Ignored
        );
        assert_eq!(table.update(shape, RunOutcome::Missing, "d.log"), UpdateEffect::Ignored);
        assert_eq!(best(&table, shape), Some(10.0));
    }

    #[test]
    fn test_success_replaces_diagnostic() {
        let shape = Shape::new(4, 4, 4);
        let mut table = WinnerTable::new();
        assert_eq!(table.update(shape, RunOutcome::Missing, "a.log"), UpdateEffect::Diagnosed);
        assert_eq!(table.update(shape, RunOutcome::Failed(1), "b.log"), UpdateEffect::Diagnosed);
        let diagnostic = table.diagnostics().next().map(|(_, d)| d.to_string());
        assert_eq!(diagnostic.as_deref(), Some("1 errors: b.log"));

        // A zero-throughput success still beats a diagnostic.
        assert_eq!(table.update(shape, success(0.0), "c.log"), UpdateEffect::Created);
        assert_eq!(best(&table, shape), Some(0.0));
        assert_eq!(table.diagnostics().count(), 0);
    }

    #[test]
    fn test_diagnostic_wording() {
        let missing = Diagnostic::new(DiagnosticKind::MissingLog, "x.log");
        let incomplete = Diagnostic::new(
            DiagnosticKind::IncompleteLog {
                reason: IncompleteReason::NoErrorCount,
            },
            "x.log",
        );
        let failed = Diagnostic::new(DiagnosticKind::FailedRun { errors: 2 }, "x.log");
        assert_eq!(missing.to_string(), "log missing: x.log");
        assert_eq!(incomplete.to_string(), "log incomplete (no error count): x.log");
        assert_eq!(failed.to_string(), "2 errors: x.log");
    }

    #[test]
    fn test_iteration_follows_insertion_order() {
        let shapes = [Shape::new(9, 9, 9), Shape::new(1, 1, 1), Shape::new(5, 5, 5)];
        let mut table = WinnerTable::new();
        for shape in shapes {
            table.update(shape, RunOutcome::Missing, "m.log");
        }
        table.update(shapes[1], success(2.0), "s.log");
        let order: Vec<Shape> = table.iter().map(|(shape, _)| shape).collect();
        assert_eq!(order, shapes.to_vec());
        assert_eq!(table.winners().count(), 1);
        assert_eq!(table.diagnostics().count(), 2);
    }

    fn outcome() -> impl Strategy<Value = (u8, RunOutcome)> {
        let outcome = prop_oneof![
            Just(RunOutcome::Missing),
            Just(RunOutcome::Incomplete(IncompleteReason::NoWinner)),
            (1u64..5).prop_map(RunOutcome::Failed),
            (0u32..2000).prop_map(|t| success(f64::from(t) / 10.0)),
        ];
        (0u8..3, outcome)
    }

    fn fold(outcomes: &[(u8, RunOutcome)]) -> WinnerTable {
        let mut table = WinnerTable::new();
        for (i, (shape, outcome)) in outcomes.iter().enumerate() {
            let shape = Shape::new(usize::from(*shape) + 1, 8, 8);
            table.update(shape, outcome.clone(), &format!("run{}.log", i));
        }
        table
    }

    proptest! {
        #[test]
        fn prop_winner_is_max_throughput(
            (outcomes, shuffled) in prop::collection::vec(outcome(), 0..16)
                .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
        ) {
            let table = fold(&outcomes);
            let permuted = fold(&shuffled);

            for id in 0u8..3 {
                let shape = Shape::new(usize::from(id) + 1, 8, 8);
                let seen: Vec<&RunOutcome> = outcomes
                    .iter()
                    .filter(|(s, _)| *s == id)
                    .map(|(_, o)| o)
                    .collect();
                let expected = seen
                    .iter()
                    .filter_map(|o| o.record().map(|r| r.throughput))
                    .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t))));

                prop_assert_eq!(table.get(&shape).is_some(), !seen.is_empty());
                prop_assert_eq!(best(&table, shape), expected);
                prop_assert_eq!(best(&permuted, shape), expected);
            }
        }

        #[test]
        fn prop_merge_matches_single_fold(
            outcomes in prop::collection::vec(outcome(), 0..16),
            split in 0usize..16,
        ) {
            let split = split.min(outcomes.len());
            let mut left = fold(&outcomes[..split]);
            left.merge(fold(&outcomes[split..]));
            let whole = fold(&outcomes);

            prop_assert_eq!(left.len(), whole.len());
            for (shape, entry) in whole.iter() {
                prop_assert_eq!(best(&left, shape), entry.throughput());
            }
        }
    }
}
