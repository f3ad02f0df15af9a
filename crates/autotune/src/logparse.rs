//! Extraction of run outcomes from tuner benchmark logs.

use serde::Serialize;
use smmtune_kernels::{parse_throughput, THROUGHPUT_UNIT};
use std::fmt;

pub const ERROR_COUNT_MARKER: &str = "Number of errors: ";
pub const WINNER_MARKER: &str = "WINNER: ";

/// Unit spellings the tuner has emitted for [`THROUGHPUT_UNIT`].
pub const THROUGHPUT_UNIT_ALIASES: &[&str] = &["GFlops"];

/// The winning line of one run, with its unit normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRecord {
    pub text: String,
    /// GFlop/s
    pub throughput: f64,
}

impl PerformanceRecord {
    /// Builds a record from a winner line, or `None` if it carries no throughput.
    pub fn from_winner_line(line: &str) -> Option<Self> {
        let text = normalize_units(line.trim());
        let throughput = extract_throughput(&text)?;
        Some(Self { text, throughput })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteReason {
    NoErrorCount,
    NoWinner,
    NoThroughput,
}

impl fmt::Display for IncompleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IncompleteReason::NoErrorCount => "no error count",
            IncompleteReason::NoWinner => "no winner line",
            IncompleteReason::NoThroughput => "no throughput",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The log file was never written. Detected by the caller, never by [`parse`].
    Missing,
    Incomplete(IncompleteReason),
    Failed(u64),
    Succeeded(PerformanceRecord),
}

impl RunOutcome {
    pub fn record(&self) -> Option<&PerformanceRecord> {
        match self {
            RunOutcome::Succeeded(record) => Some(record),
            _ => None,
        }
    }
}

/// Classifies one benchmark log.
pub fn parse(log_text: &str) -> RunOutcome {
    let errors = match find_error_count(log_text) {
        Some(errors) => errors,
        None => return RunOutcome::Incomplete(IncompleteReason::NoErrorCount),
    };
    if errors != 0 {
        return RunOutcome::Failed(errors);
    }

    let line = match find_winner_line(log_text) {
        Some(line) => line,
        None => return RunOutcome::Incomplete(IncompleteReason::NoWinner),
    };
    match PerformanceRecord::from_winner_line(line) {
        Some(record) => RunOutcome::Succeeded(record),
        None => RunOutcome::Incomplete(IncompleteReason::NoThroughput),
    }
}

/// First `Number of errors: <digits>` that is terminated by a newline.
pub fn find_error_count(text: &str) -> Option<u64> {
    text.match_indices(ERROR_COUNT_MARKER).find_map(|(idx, _)| {
        let rest = &text[idx + ERROR_COUNT_MARKER.len()..];
        let digits = leading_digits(rest);
        if digits.is_empty() || !rest[digits.len()..].starts_with('\n') {
            return None;
        }
        // Counts too large for u64 are still failures.
        Some(digits.parse().unwrap_or(u64::MAX))
    })
}

/// Body of the first complete `WINNER: <rank> <body>` line.
pub fn find_winner_line(text: &str) -> Option<&str> {
    text.split_inclusive('\n').find_map(|line| {
        let line = line.strip_suffix('\n')?;
        let rest = line.strip_prefix(WINNER_MARKER)?;
        let rank = leading_digits(rest);
        if rank.is_empty() {
            return None;
        }
        let body = rest[rank.len()..].strip_prefix(' ')?;
        (!body.is_empty()).then_some(body)
    })
}

pub fn normalize_units(line: &str) -> String {
    THROUGHPUT_UNIT_ALIASES
        .iter()
        .fold(line.to_string(), |text, alias| text.replace(alias, THROUGHPUT_UNIT))
}

/// Value of the first `# <number> GFlop/s` in a normalized line.
///
/// The number and unit follow the descriptor decoder's grammar, so every
/// accepted throughput can also be decoded.
pub fn extract_throughput(line: &str) -> Option<f64> {
    line.match_indices("# ").find_map(|(idx, marker)| {
        let rest = &line[idx + marker.len()..];
        let len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let after = &rest[len..];
        let unit_text = after.trim_start();
        if unit_text.len() == after.len() {
            return None;
        }
        let unit = unit_text.split(char::is_whitespace).next()?;
        if unit != THROUGHPUT_UNIT {
            return None;
        }
        parse_throughput(&rest[..len])
    })
}

fn leading_digits(text: &str) -> &str {
    let len = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    &text[..len]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(lines: &[&str]) -> String {
        let mut text = String::from("Compiling 42 kernels\n");
        for line in lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_successful_log_normalizes_unit() {
        let text = log(&[
            "Number of errors: 0",
            "WINNER: 3 Kernel_dnt_largeDB1(m=23, n=23, k=23) , # 120.5 GFlops",
        ]);
        match parse(&text) {
            RunOutcome::Succeeded(record) => {
                assert!(record.text.ends_with("120.5 GFlop/s"));
                assert!(record.text.starts_with("Kernel_dnt_largeDB1("));
                assert_eq!(record.throughput, 120.5);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_winner_at_start_of_text() {
        let text = "WINNER: 1 Kernel_dnt_tiny() , # 9.5 GFlop/s\nNumber of errors: 0\n";
        let record = parse(text).record().cloned().unwrap();
        assert_eq!(record.throughput, 9.5);
    }

    #[test]
    fn test_failed_log() {
        let text = log(&[
            "Number of errors: 2",
            "WINNER: 3 Kernel_dnt_small(m=4, n=4, k=4) , # 10.0 GFlop/s",
        ]);
        assert_eq!(parse(&text), RunOutcome::Failed(2));
    }

    #[test]
    fn test_incomplete_logs() {
        assert_eq!(
            parse(&log(&["launching kernel 17 of 400"])),
            RunOutcome::Incomplete(IncompleteReason::NoErrorCount)
        );
        // Marker cut off before its newline.
        assert_eq!(
            parse("Number of errors: 0"),
            RunOutcome::Incomplete(IncompleteReason::NoErrorCount)
        );
        assert_eq!(
            parse(&log(&["Number of errors: 0"])),
            RunOutcome::Incomplete(IncompleteReason::NoWinner)
        );
        // Winner line without its terminating newline.
        assert_eq!(
            parse("Number of errors: 0\nWINNER: 3 Kernel_dnt_tiny() , # 9.5 GFlop/s"),
            RunOutcome::Incomplete(IncompleteReason::NoWinner)
        );
        assert_eq!(
            parse(&log(&["Number of errors: 0", "WINNER: 3 Kernel_dnt_tiny() , # 9.5 MFlop/s"])),
            RunOutcome::Incomplete(IncompleteReason::NoThroughput)
        );
        assert_eq!(
            parse(&log(&["Number of errors: 0", "WINNER: 3 Kernel_dnt_tiny() , # 1.2.3 GFlop/s"])),
            RunOutcome::Incomplete(IncompleteReason::NoThroughput)
        );
    }

    #[test]
    fn test_error_count_skips_malformed_markers() {
        let text = "Number of errors: n/a\nNumber of errors: 7\n";
        assert_eq!(find_error_count(text), Some(7));
        assert_eq!(find_error_count("Number of errors: 99999999999999999999999\n"), Some(u64::MAX));
    }

    #[test]
    fn test_winner_line_requires_rank() {
        assert_eq!(find_winner_line("WINNER: Kernel_dnt_tiny()\n"), None);
        assert_eq!(find_winner_line("WINNER: 12 \n"), None);
        assert_eq!(find_winner_line("xWINNER: 1 a\nWINNER: 2 b\n"), Some("b"));
    }

    #[test]
    fn test_extract_throughput() {
        assert_eq!(extract_throughput("Kernel_dnt_x() , # 80.25 GFlop/s"), Some(80.25));
        assert_eq!(extract_throughput("# note # 3.5 GFlop/s"), Some(3.5));
        assert_eq!(extract_throughput("Kernel_dnt_x() , # 80.25 GFlops"), None);
        assert_eq!(extract_throughput("Kernel_dnt_x()"), None);
    }

    #[test]
    fn test_extract_throughput_matches_decoder_grammar() {
        for line in [
            "Kernel_dnt_x() , # 120 GFlop/s",
            "Kernel_dnt_x() , # .5 GFlop/s",
            "Kernel_dnt_x() , # 120. GFlop/s",
            "Kernel_dnt_x() , # 130.0 GFlop/sec",
            "Kernel_dnt_x() , # 130.0GFlop/s",
        ] {
            assert_eq!(extract_throughput(line), None, "{}", line);
        }
        assert_eq!(extract_throughput("Kernel_dnt_x() , # 130.0  GFlop/s (best)"), Some(130.0));
        assert_eq!(
            parse(&log(&["Number of errors: 0", "WINNER: 3 Kernel_dnt_tiny() , # 120 GFlop/s"])),
            RunOutcome::Incomplete(IncompleteReason::NoThroughput)
        );
    }
}
