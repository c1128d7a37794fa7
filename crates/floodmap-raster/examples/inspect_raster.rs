//! Example: Print georeferencing and category statistics of a flood raster.
//!
//! Usage: cargo run --example inspect_raster -- <raster.tif> [--depth]

use floodmap_raster::{read_category_raster, read_depth_raster, reclassify, Thresholds};
use std::env;
use std::time::Instant;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <raster.tif> [--depth]", args[0]);
        eprintln!("Example: {} flood_categories.tif", args[0]);
        std::process::exit(1);
    }

    let path = &args[1];
    let is_depth = args.iter().any(|a| a == "--depth");
    let start = Instant::now();

    let categories = if is_depth {
        let depth = read_depth_raster(path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });
        reclassify(&depth, &Thresholds::default())
    } else {
        read_category_raster(path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        })
    };

    println!("Loaded {} in {:.3}s", path, start.elapsed().as_secs_f64());

    let (width, height) = categories.dimensions();
    let extent = categories.extent();
    println!("Size: {} x {} pixels, CRS {}", width, height, categories.crs());
    println!(
        "Extent: x {:.3} to {:.3}, y {:.3} to {:.3}",
        extent.min_x, extent.max_x, extent.min_y, extent.max_y
    );

    let histogram = categories.histogram();
    for (category, cells) in histogram.iter() {
        println!("  {:<28} {:>10} cells", category.label(), cells);
    }
    println!("  {:<28} {:>10} cells", "No data", categories.nodata_count());
}
