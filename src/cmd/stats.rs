//! Completion statistics: `tracker stats`.

use anyhow::Result;

use issue_tracker::config::TrackerConfig;

use super::open_db;

pub fn cmd_stats(config: &TrackerConfig) -> Result<()> {
    let db = open_db(config)?;
    let counts = db.state_counts()?;
    let stats = db.completion_stats()?;

    println!("{}", console::style("Issues").bold());
    for (state, count) in counts {
        println!("  {:<10} {}", state.label(), count);
    }
    println!();

    println!("{}", console::style("Completion time").bold());
    match (stats.avg(), stats.min(), stats.max()) {
        (Some(avg), Some(min), Some(max)) => {
            println!("  average    {}", avg);
            println!("  fastest    {}", min);
            println!("  slowest    {}", max);
        }
        _ => println!("  No completed issues yet."),
    }
    Ok(())
}
