//! Cost profiler.
//!
//! Tallies per-opcode execution counts and gas, attributes costs to source
//! lines, and dumps the result as CSV. Storage writes dominate real-world
//! gas, so the stepper reports them under a synthetic opcode label that
//! keeps their cost apart from ordinary SYSCALL overhead.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Label the stepper uses for size-scaled storage writes.
pub const STORAGE_OPCODE: &str = "_STORAGE";

/// Accumulated stats for one opcode.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OpcodeStats {
    pub count: u64,
    pub total_cost: f64,
}

/// Accumulated stats for one source line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineStats {
    pub hits: u64,
    pub total_cost: f64,
}

/// Per-opcode and per-line cost accounting for one emulator.
#[derive(Debug, Clone, Default)]
pub struct Profiler {
    opcode_stats: BTreeMap<String, OpcodeStats>,
    line_stats: BTreeMap<u32, LineStats>,
    current_line: Option<u32>,
    source_lines: Vec<String>,
}

impl Profiler {
    /// Creates an empty profiler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retains the source text so the dump can quote each line.
    pub fn set_source(&mut self, source: &str) {
        self.source_lines = source.lines().map(str::to_string).collect();
    }

    /// Sets the line that subsequent costs are attributed to.
    pub fn set_current_line(&mut self, line: Option<u32>) {
        self.current_line = line;
    }

    /// Records one executed instruction.
    pub fn on_step(&mut self, opcode: &str, cost: f64) {
        let stats = self.opcode_stats.entry(opcode.to_string()).or_default();
        stats.count += 1;
        stats.total_cost += cost;

        if let Some(line) = self.current_line {
            let stats = self.line_stats.entry(line).or_default();
            stats.hits += 1;
            stats.total_cost += cost;
        }
    }

    /// Returns the stats recorded for `opcode`, if any.
    pub fn opcode_stats(&self, opcode: &str) -> Option<OpcodeStats> {
        self.opcode_stats.get(opcode).copied()
    }

    /// Returns the stats recorded for `line`, if any.
    pub fn line_stats(&self, line: u32) -> Option<LineStats> {
        self.line_stats.get(&line).copied()
    }

    /// Clears all tallies.
    pub fn reset(&mut self) {
        self.opcode_stats.clear();
        self.line_stats.clear();
        self.current_line = None;
    }

    /// Dumps one row per source line with cumulative cost and hit count,
    /// followed by the per-opcode totals.
    pub fn dump_csv(&self) -> String {
        let mut out = String::from("line,hits,cost,source\n");

        let last_mapped = self.line_stats.keys().max().copied().unwrap_or(0);
        let line_count = (self.source_lines.len() as u32).max(last_mapped);
        for line in 1..=line_count {
            let stats = self.line_stats.get(&line).copied().unwrap_or_default();
            let source = self
                .source_lines
                .get(line as usize - 1)
                .map(String::as_str)
                .unwrap_or("");
            let _ = writeln!(
                out,
                "{line},{},{:.4},\"{}\"",
                stats.hits,
                stats.total_cost,
                source.replace('"', "\"\"")
            );
        }

        out.push_str("\nopcode,count,cost\n");
        for (opcode, stats) in &self.opcode_stats {
            let _ = writeln!(out, "{opcode},{},{:.4}", stats.count, stats.total_cost);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_to_current_line() {
        let mut profiler = Profiler::new();
        profiler.set_current_line(Some(3));
        profiler.on_step("ADD", 0.001);
        profiler.on_step("ADD", 0.001);
        profiler.set_current_line(Some(4));
        profiler.on_step(STORAGE_OPCODE, 2.0);

        let line3 = profiler.line_stats(3).unwrap();
        assert_eq!(line3.hits, 2);
        assert!((line3.total_cost - 0.002).abs() < 1e-9);

        let line4 = profiler.line_stats(4).unwrap();
        assert_eq!(line4.hits, 1);
        assert!((line4.total_cost - 2.0).abs() < 1e-9);

        let add = profiler.opcode_stats("ADD").unwrap();
        assert_eq!(add.count, 2);
    }

    #[test]
    fn test_no_line_attribution_without_line() {
        let mut profiler = Profiler::new();
        profiler.on_step("ADD", 0.001);
        assert!(profiler.line_stats(1).is_none());
        assert_eq!(profiler.opcode_stats("ADD").unwrap().count, 1);
    }

    #[test]
    fn test_dump_csv_quotes_source() {
        let mut profiler = Profiler::new();
        profiler.set_source("a = 1\nb = \"x\"\n");
        profiler.set_current_line(Some(2));
        profiler.on_step("ADD", 0.001);

        let csv = profiler.dump_csv();
        assert!(csv.starts_with("line,hits,cost,source\n"));
        assert!(csv.contains("1,0,0.0000,\"a = 1\""));
        assert!(csv.contains("2,1,0.0010,\"b = \"\"x\"\"\""));
        assert!(csv.contains("ADD,1,0.0010"));
    }

    #[test]
    fn test_reset_clears_tallies() {
        let mut profiler = Profiler::new();
        profiler.set_current_line(Some(1));
        profiler.on_step("ADD", 0.001);
        profiler.reset();
        assert!(profiler.opcode_stats("ADD").is_none());
        assert!(profiler.line_stats(1).is_none());
    }
}
