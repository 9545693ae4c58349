//! Cross-device collection: which lines reach the summary, and when a run
//! stops early.

use serde::Serialize;

use crate::fetch::DeviceResult;

/// What to do after a device fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPolicy {
    #[default]
    ContinueOnError,
    AbortOnError,
}

impl RunPolicy {
    /// True when the run must stop after `result`.
    pub fn should_stop(self, result: &DeviceResult) -> bool {
        self == Self::AbortOnError && !result.ok
    }
}

/// Gathers canonical lines from successful results, in device order.
///
/// Results that parsed but did not match the expected layout only carry
/// diagnostic lines; they are left out unless `include_unexpected` is set.
pub fn collect_summary_lines(results: &[DeviceResult], include_unexpected: bool) -> Vec<String> {
    results
        .iter()
        .filter(|r| r.ok)
        .filter(|r| include_unexpected || r.warning.is_none())
        .flat_map(|r| r.lines.iter().cloned())
        .collect()
}

/// Counts of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTally {
    pub devices: usize,
    pub succeeded: usize,
    pub unexpected: usize,
    pub failed: usize,
}

impl RunTally {
    pub fn from_results(results: &[DeviceResult]) -> Self {
        let mut tally = Self::default();
        for result in results {
            tally.record(result);
        }
        tally
    }

    pub fn record(&mut self, result: &DeviceResult) {
        self.devices += 1;
        match (result.ok, result.warning) {
            (false, _) => self.failed += 1,
            (true, Some(_)) => self.unexpected += 1,
            (true, None) => self.succeeded += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Failure, FailureKind};
    use crate::lines::FormatWarning;

    fn result(place: &str, ok: bool, warning: Option<FormatWarning>, lines: &[&str]) -> DeviceResult {
        DeviceResult {
            base: "http://10.0.0.1".to_string(),
            place: place.to_string(),
            ok,
            failure: (!ok).then(|| Failure {
                kind: FailureKind::Transport,
                message: "timed out".to_string(),
            }),
            rows: Vec::new(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
            warning,
            diagnostics: None,
            html: None,
        }
    }

    fn mixed() -> Vec<DeviceResult> {
        vec![
            result("A", true, None, &["A\t흑백\t10", "A\t컬러\t1"]),
            result("B", false, None, &[]),
            result(
                "C",
                true,
                Some(FormatWarning::UnexpectedRowsLength),
                &["C\tWARN\trows length=1 (expected 4)", "C\tTotal 1\t5"],
            ),
            result("D", true, None, &["D\t흑백\t20", "D\t컬러\t2"]),
        ]
    }

    #[test]
    fn summary_lines_skip_failures_and_unexpected() {
        let lines = collect_summary_lines(&mixed(), false);
        assert_eq!(lines, vec!["A\t흑백\t10", "A\t컬러\t1", "D\t흑백\t20", "D\t컬러\t2"]);
    }

    #[test]
    fn unexpected_lines_can_be_included() {
        let lines = collect_summary_lines(&mixed(), true);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[2], "C\tWARN\trows length=1 (expected 4)");
    }

    #[test]
    fn abort_policy_stops_only_on_failure() {
        let results = mixed();
        assert!(!RunPolicy::AbortOnError.should_stop(&results[0]));
        assert!(RunPolicy::AbortOnError.should_stop(&results[1]));
        assert!(!RunPolicy::AbortOnError.should_stop(&results[2]));
        assert!(!RunPolicy::ContinueOnError.should_stop(&results[1]));
        assert_eq!(RunPolicy::default(), RunPolicy::ContinueOnError);
    }

    #[test]
    fn tally_counts_each_outcome() {
        let tally = RunTally::from_results(&mixed());
        assert_eq!(
            tally,
            RunTally {
                devices: 4,
                succeeded: 2,
                unexpected: 1,
                failed: 1,
            }
        );
    }
}
