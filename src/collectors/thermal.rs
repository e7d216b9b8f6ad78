//! CPU temperature collector.
//!
//! Reads a sysfs thermal zone file (e.g. /sys/class/thermal/thermal_zone0/temp)
//! containing an integer temperature in millidegrees Celsius.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;

use crate::collectors::{CollectError, Collector};
use crate::config::DEFAULT_TEMP_PATH;
use crate::metrics::Sample;

/// Temperature reader over one sysfs thermal zone.
pub struct ThermalZoneTemp {
    path: PathBuf,
}

impl ThermalZoneTemp {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ThermalZoneTemp {
    fn default() -> Self {
        Self::new(DEFAULT_TEMP_PATH)
    }
}

impl Collector for ThermalZoneTemp {
    fn id(&self) -> &'static str {
        "cpu_temp"
    }

    fn collect(&self) -> Result<Vec<Sample>, CollectError> {
        let content = fs::read_to_string(&self.path).map_err(|e| CollectError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        let raw = content.trim();
        // Expect millidegrees Celsius (integer)
        let millidegrees: i64 = raw.parse().map_err(|_| CollectError::Parse {
            path: self.path.clone(),
            what: "temperature",
            value: raw.to_string(),
        })?;

        let celsius = millidegrees as f64 / 1000.0;

        Ok(vec![Sample::new("cpu_temperature", celsius)
            .with_unit("celsius")
            .with_timestamp(Utc::now())
            .with_label("source", "sysfs")
            .with_label("path", self.path.to_string_lossy())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_millidegrees_as_celsius() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "55432").unwrap();

        let collector = ThermalZoneTemp::new(file.path());
        let samples = collector.collect().unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name, "cpu_temperature");
        assert_eq!(samples[0].unit, "celsius");
        assert!((samples[0].value - 55.432).abs() < 1e-9);
        assert_eq!(samples[0].label("source"), Some("sysfs"));
        assert!(samples[0].timestamp.is_some());
    }

    #[test]
    fn malformed_value_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not-a-number").unwrap();

        let collector = ThermalZoneTemp::new(file.path());
        let err = collector.collect().unwrap_err();
        assert!(matches!(err, CollectError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let collector = ThermalZoneTemp::new("/nonexistent/thermal_zone99/temp");
        let err = collector.collect().unwrap_err();
        assert!(matches!(err, CollectError::Io { .. }));
    }
}
