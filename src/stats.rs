//! Cache and knowledge-store overview.
//!
//! Prints a quick summary of what the assistant is working with: cache
//! occupancy and hit counters, knowledge-store coverage, and graph
//! size. Used by `civi stats` to confirm data files loaded and the
//! cache directory is healthy.

use anyhow::Result;

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::graph::CivicGraph;
use crate::knowledge::CivicKnowledge;

/// Run the stats command: inspect the stores and print a summary.
pub fn run_stats(config: &Config) -> Result<()> {
    let knowledge = CivicKnowledge::load(&config.knowledge);
    let graph = CivicGraph::build(&knowledge);
    let cache = ResponseCache::open(&config.cache);
    let stats = cache.stats();

    let cache_size: u64 = std::fs::read_dir(&config.cache.dir)
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|e| e.metadata().ok())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0);

    println!("CivicMind — Store Stats");
    println!("=======================");
    println!();
    println!("  Cache dir:   {}", config.cache.dir.display());
    println!("  Size:        {}", format_bytes(cache_size));
    println!("  Durable:     {} records", stats.durable_count);
    println!("  In memory:   {} entries", stats.memory_size);
    println!("  TTL:         {} hours", config.cache.ttl_hours);
    println!();
    println!("  Zones:       {}", knowledge.zones().len());
    println!("  Departments: {}", knowledge.departments().len());
    println!("  Pincodes:    {}", knowledge.pincodes().len());
    println!("  Issue rules: {}", knowledge.issue_rules().len());
    println!();
    println!(
        "  Graph:       {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_format_scales() {
        assert_eq!(format_bytes(10), "10 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
