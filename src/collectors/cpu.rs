//! CPU utilization collector over /proc/stat tick counters.
//!
//! Utilization is a delta between two observations, so the collector keeps
//! the previous per-core tick snapshot. The first invocation only establishes
//! the baseline and returns no samples. A failed or partially parsed read
//! leaves the baseline untouched, so the next tick still has a valid anchor.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use ahash::AHashMap as HashMap;
use chrono::Utc;

use crate::collectors::{CollectError, Collector};
use crate::config::DEFAULT_CPU_STAT_PATH;
use crate::metrics::Sample;

/// Idle and total tick counters for one core line.
#[derive(Debug, Clone, Copy)]
struct CpuTicks {
    idle: u64,
    total: u64,
}

/// Stateful per-core utilization reader.
///
/// The snapshot is guarded by a mutex; the runner invokes collectors
/// sequentially, but the collector stays safe under concurrent use.
pub struct CpuUtilization {
    path: PathBuf,
    previous: Mutex<Option<HashMap<String, CpuTicks>>>,
}

impl CpuUtilization {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            previous: Mutex::new(None),
        }
    }
}

impl Default for CpuUtilization {
    fn default() -> Self {
        Self::new(DEFAULT_CPU_STAT_PATH)
    }
}

impl Collector for CpuUtilization {
    fn id(&self) -> &'static str {
        "cpu_utilization"
    }

    fn collect(&self) -> Result<Vec<Sample>, CollectError> {
        let current = read_cpu_ticks(&self.path)?;

        let mut previous = self
            .previous
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(prev) = previous.take() else {
            // Warm-up: utilization is undefined without two observations.
            *previous = Some(current);
            return Ok(Vec::new());
        };

        let now = Utc::now();
        let mut samples = Vec::new();

        for (core, curr) in &current {
            let Some(prev_ticks) = prev.get(core) else {
                continue;
            };

            let delta_idle = curr.idle as f64 - prev_ticks.idle as f64;
            let delta_total = curr.total as f64 - prev_ticks.total as f64;
            if delta_total <= 0.0 {
                // Counter wrap or zero elapsed ticks; skip the core this tick.
                continue;
            }

            let usage = ((delta_total - delta_idle) / delta_total * 100.0).clamp(0.0, 100.0);

            // The aggregate "cpu" line gets a readable tag; cores keep theirs.
            let cpu_tag = if core == "cpu" { "total" } else { core.as_str() };

            samples.push(
                Sample::new("cpu_utilization", usage)
                    .with_unit("percent")
                    .with_timestamp(now)
                    .with_label("source", "procfs")
                    .with_label("path", self.path.to_string_lossy())
                    .with_label("cpu", cpu_tag),
            );
        }

        *previous = Some(current);
        Ok(samples)
    }
}

/// Parse the cpu lines of a /proc/stat style file.
///
/// Reading stops at the first line that is not a cpu line. Any malformed tick
/// counter aborts the whole read; partial snapshots are never returned.
fn read_cpu_ticks(path: &Path) -> Result<HashMap<String, CpuTicks>, CollectError> {
    let content = fs::read_to_string(path).map_err(|e| CollectError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut out = HashMap::new();

    for line in content.lines() {
        if !line.starts_with("cpu") {
            break;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            continue;
        }

        let mut values = Vec::with_capacity(fields.len() - 1);
        for field in &fields[1..] {
            let v: u64 = field.parse().map_err(|_| CollectError::Parse {
                path: path.to_path_buf(),
                what: "tick counter",
                value: field.to_string(),
            })?;
            values.push(v);
        }

        let total: u64 = values.iter().sum();

        // idle (field 4) plus iowait (field 5) when present.
        let mut idle = values[3];
        if values.len() >= 5 {
            idle += values[4];
        }

        out.insert(fields[0].to_string(), CpuTicks { idle, total });
    }

    if out.is_empty() {
        return Err(CollectError::Empty {
            path: path.to_path_buf(),
            reason: "no cpu stats found",
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_stat(file: &NamedTempFile, content: &str) {
        fs::write(file.path(), content).unwrap();
    }

    fn sample_for<'a>(samples: &'a [Sample], cpu: &str) -> &'a Sample {
        samples
            .iter()
            .find(|s| s.label("cpu") == Some(cpu))
            .unwrap_or_else(|| panic!("no sample for {}", cpu))
    }

    #[test]
    fn first_collect_is_warm_up() {
        let file = NamedTempFile::new().unwrap();
        write_stat(&file, "cpu 100 0 100 800 0 0 0 0\n");

        let collector = CpuUtilization::new(file.path());
        assert!(collector.collect().unwrap().is_empty());
    }

    #[test]
    fn second_collect_computes_deltas() {
        let file = NamedTempFile::new().unwrap();
        write_stat(
            &file,
            "cpu  10 0 10 80 0 0 0 0\ncpu0 10 0 10 80 0 0 0 0\nintr 12345\n",
        );

        let collector = CpuUtilization::new(file.path());
        assert!(collector.collect().unwrap().is_empty());

        // +50 busy, +30 idle over 80 elapsed ticks => 62.5% usage
        write_stat(
            &file,
            "cpu  40 0 30 110 0 0 0 0\ncpu0 40 0 30 110 0 0 0 0\nintr 12345\n",
        );

        let samples = collector.collect().unwrap();
        assert_eq!(samples.len(), 2);

        let overall = sample_for(&samples, "total");
        assert_eq!(overall.name, "cpu_utilization");
        assert_eq!(overall.unit, "percent");
        assert!((overall.value - 62.5).abs() < 1e-9);

        let core0 = sample_for(&samples, "cpu0");
        assert!((core0.value - 62.5).abs() < 1e-9);
    }

    #[test]
    fn iowait_counts_as_idle() {
        let file = NamedTempFile::new().unwrap();
        write_stat(&file, "cpu 0 0 0 50 50 0 0 0\n");

        let collector = CpuUtilization::new(file.path());
        collector.collect().unwrap();

        // 100 elapsed ticks, 40 idle + 60 iowait => fully idle
        write_stat(&file, "cpu 0 0 0 90 110 0 0 0\n");
        let samples = collector.collect().unwrap();
        assert_eq!(samples[0].value, 0.0);
    }

    #[test]
    fn unchanged_counters_are_skipped() {
        let file = NamedTempFile::new().unwrap();
        write_stat(&file, "cpu 10 0 10 80 0 0 0 0\n");

        let collector = CpuUtilization::new(file.path());
        collector.collect().unwrap();
        // Same ticks again: delta total is zero, no sample and no error.
        assert!(collector.collect().unwrap().is_empty());
    }

    #[test]
    fn usage_is_clamped_to_valid_range() {
        let file = NamedTempFile::new().unwrap();
        write_stat(&file, "cpu 100 0 0 100 0 0 0 0\n");

        let collector = CpuUtilization::new(file.path());
        collector.collect().unwrap();

        // Idle grows faster than total (skewed counters): clamp at 0.
        write_stat(&file, "cpu 50 0 0 250 0 0 0 0\n");
        let samples = collector.collect().unwrap();
        assert_eq!(samples[0].value, 0.0);
    }

    #[test]
    fn parse_error_preserves_the_baseline() {
        let file = NamedTempFile::new().unwrap();
        write_stat(&file, "cpu 10 0 10 80 0 0 0 0\n");

        let collector = CpuUtilization::new(file.path());
        collector.collect().unwrap();

        write_stat(&file, "cpu 40 0 bogus 110 0 0 0 0\n");
        assert!(matches!(
            collector.collect().unwrap_err(),
            CollectError::Parse { .. }
        ));

        // The failed read must not have replaced the snapshot: deltas are
        // still computed against the original baseline.
        write_stat(&file, "cpu 40 0 30 110 0 0 0 0\n");
        let samples = collector.collect().unwrap();
        assert_eq!(samples.len(), 1);
        assert!((samples[0].value - 62.5).abs() < 1e-9);
    }

    #[test]
    fn reading_stops_at_first_non_cpu_line() {
        let file = NamedTempFile::new().unwrap();
        write_stat(
            &file,
            "cpu 10 0 10 80 0 0 0 0\nintr 1 2 3\ncpu0 10 0 10 80 0 0 0 0\n",
        );

        let collector = CpuUtilization::new(file.path());
        collector.collect().unwrap();

        write_stat(
            &file,
            "cpu 40 0 30 110 0 0 0 0\nintr 1 2 3\ncpu0 40 0 30 110 0 0 0 0\n",
        );
        let samples = collector.collect().unwrap();

        // cpu0 sits below the intr line and is never read.
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].label("cpu"), Some("total"));
    }

    #[test]
    fn file_without_cpu_lines_is_empty_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "intr 1 2 3").unwrap();

        let collector = CpuUtilization::new(file.path());
        assert!(matches!(
            collector.collect().unwrap_err(),
            CollectError::Empty { .. }
        ));
    }
}
