//! `voxelspan inspect` command - Print the decomposition and layout of a grid.

use colored::Colorize;
use voxelspan::prelude::*;

use super::{build_span, GridArgs};
use crate::error::CliResult;
use crate::shape::Shape;

/// Execute the `inspect` command.
pub fn execute(args: &GridArgs, shape: Shape, show_views: bool, show_halo: bool) -> CliResult<()> {
    println!("{} Inspecting block grid", "→".bright_cyan());
    let span = build_span(args, shape)?;
    let grid = span.grid();
    println!();

    print_partitions(grid);
    if show_views {
        print_views(grid);
    }
    if show_halo {
        print_halo(grid);
    }
    Ok(())
}

fn print_partitions(grid: &BlockGrid) {
    println!("{}:", "Partitions".bright_white().underline());
    let dec = grid.decomposition();
    for (p, range) in dec.partitions().iter() {
        let spans = grid.spans(p);
        println!(
            "  {} z [{}, {}) {} blocks, {} slots",
            p.to_string().bright_cyan(),
            range.z_first,
            range.z_last,
            range.block_count.to_string().bright_white(),
            spans.total_count()
        );
        for category in Category::ALL {
            let bounds = spans.bounds(category);
            if !bounds.is_empty() {
                println!("      {:<20} {}", category.to_string(), format_bounds(bounds));
            }
        }
        for direction in ByDirection::ALL {
            let ghost = spans.ghost(direction);
            match ghost.target() {
                Some(target) => println!(
                    "      {:<20} {} <- {} {}",
                    format!("ghost-{}", direction),
                    format_bounds(ghost.window_total()),
                    target.partition,
                    format_bounds(ghost.alias_total()).dimmed()
                ),
                None => println!("      {:<20} {}", format!("ghost-{}", direction), "-".dimmed()),
            }
        }
    }
    println!();
}

fn print_views(grid: &BlockGrid) {
    println!("{}:", "Launch views".bright_white().underline());
    for p in 0..grid.device_count() {
        let p = SetIdx(p);
        for view in DataView::ALL {
            let params = grid.launch_params(p, view);
            println!(
                "  {} {:<10} first {:>6} blocks {:>6} threads {:>9}",
                p.to_string().bright_cyan(),
                format!("{:?}", view),
                params.first,
                params.block_count,
                params.total_threads()
            );
        }
    }
    println!();
}

fn print_halo(grid: &BlockGrid) {
    println!("{}:", "Halo exchange".bright_white().underline());
    let plan = grid.halo_plan();
    for p in 0..plan.device_count() {
        for transfer in plan.transfers(SetIdx(p)) {
            println!(
                "  {} <- {} ({}) window {} mirrors {}",
                SetIdx(p).to_string().bright_cyan(),
                transfer.peer,
                transfer.direction,
                format_bounds(transfer.recv_window),
                format_bounds(transfer.recv_alias)
            );
        }
    }
    println!(
        "  {} {} blocks per exchange",
        "•".dimmed(),
        plan.total_blocks_exchanged().to_string().bright_white()
    );
    println!();
}

fn format_bounds(bounds: Bounds) -> String {
    format!("[{}, {})", bounds.first, bounds.end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_default_grid() {
        let args = GridArgs {
            devices: Some(2),
            ..GridArgs::default()
        };
        execute(&args, Shape::Sphere, true, true).unwrap();
    }

    #[test]
    fn test_format_bounds() {
        assert_eq!(format_bounds(Bounds::new(4, 3)), "[4, 7)");
    }
}
