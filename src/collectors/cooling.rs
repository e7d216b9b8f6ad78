//! Cooling device state collector.
//!
//! Reads the current throttle step of a thermal cooling device from sysfs
//! (e.g. /sys/class/thermal/cooling_device0/cur_state). On the Raspberry Pi
//! class of boards this is a small integer, 0 meaning no throttling.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;

use crate::collectors::{CollectError, Collector};
use crate::config::DEFAULT_COOLING_PATH;
use crate::metrics::Sample;

pub struct CoolingDeviceState {
    path: PathBuf,
}

impl CoolingDeviceState {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for CoolingDeviceState {
    fn default() -> Self {
        Self::new(DEFAULT_COOLING_PATH)
    }
}

impl Collector for CoolingDeviceState {
    fn id(&self) -> &'static str {
        "cpu_cooling_device"
    }

    fn collect(&self) -> Result<Vec<Sample>, CollectError> {
        let content = fs::read_to_string(&self.path).map_err(|e| CollectError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        let raw = content.trim();
        let state: i64 = raw.parse().map_err(|_| CollectError::Parse {
            path: self.path.clone(),
            what: "cooling state",
            value: raw.to_string(),
        })?;

        Ok(vec![Sample::new("cooling_state", state as f64)
            .with_unit("from 0 - 4")
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
    fn reads_current_state() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2").unwrap();

        let collector = CoolingDeviceState::new(file.path());
        let samples = collector.collect().unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name, "cooling_state");
        assert_eq!(samples[0].value, 2.0);
        assert_eq!(samples[0].unit, "from 0 - 4");
    }

    #[test]
    fn malformed_state_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "??").unwrap();

        let collector = CoolingDeviceState::new(file.path());
        assert!(matches!(
            collector.collect().unwrap_err(),
            CollectError::Parse { .. }
        ));
    }
}
