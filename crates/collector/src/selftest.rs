//! Built-in checks run by `smmtune-collect selftest`.
//!
//! Each case feeds synthetic log text through the same parse / update /
//! decode path as a real collection, without touching the filesystem.

use crate::collect::Collector;
use anyhow::{bail, ensure, Context, Result};
use smmtune_autotune::{parse, IncompleteReason, ParameterFile, RunOutcome};
use smmtune_kernels::{decode, encode, DescriptorError, KernelRegistry, SchemaError, Shape};
use tracing::info;

pub struct SelftestCase {
    pub name: &'static str,
    check: fn(&KernelRegistry) -> Result<()>,
}

impl SelftestCase {
    pub fn run(&self, registry: &KernelRegistry) -> Result<()> {
        (self.check)(registry)
    }
}

pub fn selftest_cases() -> Vec<SelftestCase> {
    vec![
        SelftestCase {
            name: "successful log",
            check: successful_log,
        },
        SelftestCase {
            name: "failed log",
            check: failed_log,
        },
        SelftestCase {
            name: "incomplete log",
            check: incomplete_log,
        },
        SelftestCase {
            name: "best of several runs",
            check: best_of_runs,
        },
        SelftestCase {
            name: "descriptor round trip",
            check: descriptor_round_trip,
        },
        SelftestCase {
            name: "unknown algorithm",
            check: unknown_algorithm,
        },
    ]
}

/// Runs every case, stopping at the first failure. Returns the number run.
pub fn run_selftest(registry: &KernelRegistry) -> Result<usize> {
    let cases = selftest_cases();
    for case in &cases {
        case.run(registry)
            .with_context(|| format!("selftest case '{}' failed", case.name))?;
        info!(case = case.name, "selftest case passed");
    }
    Ok(cases.len())
}

const WINNER_23: &str = "Kernel_dnt_largeDB1(m=23, n=23, k=23, tile_m=2, tile_n=3, w=8, v=6, \
                         threads=128, grouping=16, minblocks=4) , # 120.5 GFlops";

fn successful_log(_: &KernelRegistry) -> Result<()> {
    let text = format!("Number of errors: 0\nWINNER: 3 {}\n", WINNER_23);
    let RunOutcome::Succeeded(record) = parse(&text) else {
        bail!("log was not recognized as successful");
    };
    ensure!(record.text.ends_with("120.5 GFlop/s"), "unit not normalized: {}", record.text);
    ensure!(record.throughput == 120.5, "throughput {}", record.throughput);
    Ok(())
}

fn failed_log(_: &KernelRegistry) -> Result<()> {
    let outcome = parse("Number of errors: 2\n");
    ensure!(outcome == RunOutcome::Failed(2), "unexpected outcome {:?}", outcome);
    Ok(())
}

fn incomplete_log(_: &KernelRegistry) -> Result<()> {
    let outcome = parse("compiling kernels\n");
    ensure!(
        outcome == RunOutcome::Incomplete(IncompleteReason::NoErrorCount),
        "unexpected outcome {:?}",
        outcome
    );
    Ok(())
}

fn best_of_runs(registry: &KernelRegistry) -> Result<()> {
    let shape = Shape::new(23, 23, 23);
    let slower = WINNER_23.replace("120.5", "80.0");
    let failed = "Number of errors: 1\n".to_string();
    let runs = [
        format!("Number of errors: 0\nWINNER: 1 {}\n", WINNER_23),
        failed,
        format!("Number of errors: 0\nWINNER: 1 {}\n", slower),
    ];

    for order in [[0, 1, 2], [2, 1, 0], [1, 2, 0]] {
        let mut collector = Collector::new(registry.clone());
        for index in order {
            collector.ingest_log(shape, Some(runs[index].as_str()), &format!("run{}.log", index));
        }
        let (parameters, report) = collector.resolve();
        ensure!(parameters.len() == 1, "expected one winner, got {}", parameters.len());
        let perf = parameters.records()[0].perf();
        ensure!(perf == Some(120.5), "order {:?} picked perf {:?}", order, perf);
        ensure!(report.is_clean(), "unexpected problems {:?}", report.problems());

        let text = parameters.to_text()?;
        let reloaded = ParameterFile::from_text(&text, registry)?;
        ensure!(reloaded == parameters, "parameter file did not reload identically");
    }
    Ok(())
}

fn descriptor_round_trip(registry: &KernelRegistry) -> Result<()> {
    let normalized = WINNER_23.replace("GFlops", "GFlop/s");
    let params = decode(&normalized, registry)?;
    let again = decode(&encode(&params), registry)?;
    ensure!(again == params, "re-encoded descriptor decoded differently");
    Ok(())
}

fn unknown_algorithm(registry: &KernelRegistry) -> Result<()> {
    match decode("Kernel_dnt_huge(m=4, n=4, k=4) , # 5.0 GFlop/s", registry) {
        Err(DescriptorError::Schema(SchemaError::UnknownAlgorithm(name))) if name == "huge" => Ok(()),
        other => bail!("expected an unknown-algorithm error, got {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selftest_passes_with_default_registry() {
        let registry = KernelRegistry::with_default_algorithms();
        assert_eq!(run_selftest(&registry).unwrap(), selftest_cases().len());
    }

    #[test]
    fn test_selftest_fails_without_algorithms() {
        let err = run_selftest(&KernelRegistry::new()).unwrap_err();
        assert!(err.to_string().contains("best of several runs"));
    }
}
