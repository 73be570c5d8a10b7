//! Parse every GPX file in a directory in parallel.
//!
//! Run with: cargo run --example batch_summarize --features parallel -- path/to/dir

use std::time::Instant;

use track_analytics::export::format_duration;
use track_analytics::{parse_tracks_parallel, TrackConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());

    let mut names = Vec::new();
    let mut documents = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("gpx")) {
            documents.push(std::fs::read_to_string(&path)?);
            names.push(path.display().to_string());
        }
    }

    let refs: Vec<&str> = documents.iter().map(String::as_str).collect();
    let start = Instant::now();
    let results = parse_tracks_parallel(&refs, &TrackConfig::default());
    println!("Parsed {} files in {:?}\n", results.len(), start.elapsed());

    for (name, result) in names.iter().zip(results) {
        match result {
            Ok(track) => println!(
                "{}: {} ({:.2} km, {})",
                name,
                track.name(),
                track.summary().total_distance / 1000.0,
                format_duration(track.summary().duration)
            ),
            Err(e) => println!("{}: {}", name, e),
        }
    }

    Ok(())
}
