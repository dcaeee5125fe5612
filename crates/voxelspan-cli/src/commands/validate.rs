//! `voxelspan validate` command - Check the layout invariants of a grid.

use colored::Colorize;
use voxelspan::prelude::*;

use super::{build_span, GridArgs};
use crate::error::{CliError, CliResult};
use crate::shape::Shape;

/// Result of one layout check.
#[derive(Debug)]
pub struct CheckResult {
    /// Check name.
    pub name: &'static str,
    /// Failure descriptions, empty when the check passed.
    pub failures: Vec<String>,
}

/// Execute the `validate` command.
pub fn execute(args: &GridArgs, shape: Shape, detailed: bool) -> CliResult<()> {
    println!("{} Validating block grid", "→".bright_cyan());
    let span = build_span(args, shape)?;
    println!();

    let results = run_checks(span.grid());
    let mut failed = 0;
    for result in &results {
        if result.failures.is_empty() {
            println!("  {} {}", "✓".bright_green(), result.name);
        } else {
            failed += 1;
            println!(
                "  {} {} ({} failures)",
                "✗".bright_red(),
                result.name,
                result.failures.len()
            );
            let shown = if detailed { result.failures.len() } else { 3 };
            for failure in result.failures.iter().take(shown) {
                println!("      {}", failure.dimmed());
            }
        }
    }

    if failed > 0 {
        return Err(CliError::Validation(failed));
    }
    println!("\n{} All checks passed", "✓".bright_green());
    Ok(())
}

/// Run every layout check against a grid.
pub fn run_checks(grid: &BlockGrid) -> Vec<CheckResult> {
    vec![
        CheckResult {
            name: "category ranges cover owned blocks",
            failures: check_ranges(grid),
        },
        CheckResult {
            name: "ghost ranges mirror neighbor boundaries",
            failures: check_ghosts(grid),
        },
        CheckResult {
            name: "addresses round trip",
            failures: check_round_trip(grid),
        },
        CheckResult {
            name: "neighbor entries resolve",
            failures: check_neighbors(grid),
        },
    ]
}

fn check_ranges(grid: &BlockGrid) -> Vec<String> {
    let mut failures = Vec::new();
    for p in 0..grid.device_count() {
        let p = SetIdx(p);
        let spans = grid.spans(p);
        let mut next = 0;
        for category in Category::ALL {
            let bounds = spans.bounds(category);
            if bounds.first != next {
                failures.push(format!("{} {} starts at {}, expected {}", p, category, bounds.first, next));
            }
            next = bounds.end();
        }
        let active = grid.decomposition().partition(p).block_count;
        let slots = grid.classification().partition(p).slot_count();
        if next != slots || u64::from(slots) < active {
            failures.push(format!("{} owns {} slots for {} active blocks", p, next, active));
        }
    }
    failures
}

fn check_ghosts(grid: &BlockGrid) -> Vec<String> {
    let mut failures = Vec::new();
    for p in 0..grid.device_count() {
        let p = SetIdx(p);
        for direction in ByDirection::ALL {
            let ghost = grid.spans(p).ghost(direction);
            let Some(target) = ghost.target() else {
                continue;
            };
            let expected = grid.spans(target.partition).boundary(direction.opposite());
            if ghost.alias_total() != expected {
                failures.push(format!(
                    "{} ghost-{} aliases {:?}, {} boundary is {:?}",
                    p,
                    direction,
                    ghost.alias_total(),
                    target.partition,
                    expected
                ));
            }
            if ghost.window_total().count != expected.count {
                failures.push(format!("{} ghost-{} window size mismatch", p, direction));
            }
        }
    }
    failures
}

fn check_round_trip(grid: &BlockGrid) -> Vec<String> {
    let mut failures = Vec::new();
    for p in 0..grid.device_count() {
        let p = SetIdx(p);
        for address in 0..grid.spans(p).own_count() {
            let Some(origin) = grid.origin_of(p, address) else {
                failures.push(format!("{} address {} has no origin", p, address));
                continue;
            };
            match grid.address_of(p, origin) {
                Some(back) if grid.origin_of(p, back) == Some(origin) => {}
                other => failures.push(format!("{} origin {} resolves to {:?}", p, origin, other)),
            }
        }
    }
    failures
}

fn check_neighbors(grid: &BlockGrid) -> Vec<String> {
    let mut failures = Vec::new();
    for p in 0..grid.device_count() {
        let p = SetIdx(p);
        let total = grid.spans(p).total_count();
        let table = grid.neighbor_table(p);
        for (i, entry) in table.entries().iter().enumerate() {
            if *entry != NO_NEIGHBOR && *entry >= total {
                failures.push(format!(
                    "{} block {} direction {} points at {} (of {})",
                    p,
                    i / NEIGHBOR_COUNT,
                    i % NEIGHBOR_COUNT,
                    entry,
                    total
                ));
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checks_pass_on_built_grids() {
        for (devices, periodic, shape) in [
            (1, false, Shape::Dense),
            (3, false, Shape::Sphere),
            (4, true, Shape::Channel),
        ] {
            let args = GridArgs {
                devices: Some(devices),
                periodic,
                ..GridArgs::default()
            };
            let span = build_span(&args, shape).unwrap();
            for result in run_checks(span.grid()) {
                assert!(result.failures.is_empty(), "{}: {:?}", result.name, result.failures);
            }
        }
    }

    #[test]
    fn test_missing_config_is_reported() {
        let args = GridArgs {
            config: Some("/nonexistent/voxelspan.toml".to_string()),
            ..GridArgs::default()
        };
        let err = execute(&args, Shape::Dense, false).unwrap_err();
        assert!(matches!(err, CliError::Grid(_)));
    }
}
