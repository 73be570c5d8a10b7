//! Summarize a GPX file and write its JSON export next to it.
//!
//! Run with: cargo run --example summarize -- path/to/activity.gpx

use std::path::Path;

use track_analytics::export::{export_file_name, format_duration, preview};
use track_analytics::{kilometer_splits, parse_track, segment_by_speed, Track};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: summarize <activity.gpx>");
        std::process::exit(2);
    };

    let document = std::fs::read_to_string(&path)?;
    let track = parse_track(&document)?;
    print_summary(&track);

    let out = Path::new(&path).with_file_name(export_file_name(track.name()));
    std::fs::write(&out, track.to_json_pretty()?)?;
    println!("\nExported to {}", out.display());

    Ok(())
}

fn print_summary(track: &Track) {
    let stats = track.summary();

    println!("{}", track.name());
    if !track.description().is_empty() {
        println!("  {}", track.description());
    }
    println!();
    println!("  Duration:        {}", format_duration(stats.duration));
    println!("  Moving time:     {}", format_duration(stats.moving_time));
    println!("  Distance:        {:.2} km", stats.total_distance / 1000.0);
    println!("  Avg speed:       {:.1} km/h", stats.avg_speed);
    println!("  Max speed:       {:.1} km/h", stats.max_speed);
    match stats.avg_moving_speed {
        Some(speed) => println!("  Avg moving:      {:.1} km/h", speed),
        None => println!("  Avg moving:      -"),
    }
    println!("  Elevation:       +{:.0} m / -{:.0} m", stats.elevation_gain, stats.elevation_loss);
    if let (Some(avg), Some(max)) = (stats.avg_heart_rate, stats.max_heart_rate) {
        println!("  Heart rate:      {:.0} bpm avg, {} bpm max", avg, max);
    }
    println!("  Points:          {}", stats.point_count);
    println!("  Pauses:          {}", stats.pause_count);

    let bounds = track.bounds();
    println!(
        "  Center:          {:.5}, {:.5}",
        bounds.center.latitude, bounds.center.longitude
    );

    println!("\nKilometers:");
    for split in kilometer_splits(track.points()) {
        let at = split.elapsed.map(format_duration).unwrap_or_else(|| "-".to_string());
        println!("  km {:>3}  {:>12}  {:>6.0} m  {:>5.1} km/h", split.kilometer, at, split.elevation, split.speed);
    }

    println!("\nSpeed segments:");
    for segment in segment_by_speed(track.points()).iter().take(10) {
        println!("  {} x{:<4} {:.1} km/h", segment.color(), segment.coordinates.len(), segment.speed);
    }

    println!("\nPoints:");
    let shown = preview(track.points(), 10);
    for p in shown.head {
        println!("  {:>5}  {:.6}, {:.6}  {:>7.1} m  {:>8.3} km", p.index + 1, p.latitude, p.longitude, p.elevation, p.distance / 1000.0);
    }
    if shown.hidden > 0 {
        println!("  ... {} points hidden ...", shown.hidden);
    }
    for p in shown.tail {
        println!("  {:>5}  {:.6}, {:.6}  {:>7.1} m  {:>8.3} km", p.index + 1, p.latitude, p.longitude, p.elevation, p.distance / 1000.0);
    }
}
