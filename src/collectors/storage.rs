//! Filesystem usage collector.
//!
//! For each configured path this emits five samples (total, free, available,
//! used bytes and used percent) from a statvfs call, labeled best-effort with
//! the mount point, filesystem type and backing device resolved from the
//! kernel mount table.

use std::ffi::CString;
use std::fs;
use std::io;
use std::mem;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use std::collections::HashMap;

use crate::collectors::{CollectError, Collector};
use crate::config::DEFAULT_MOUNTINFO_PATH;
use crate::metrics::Sample;

/// One mount table entry, fields already unescaped.
#[derive(Debug, Clone)]
struct MountEntry {
    mount_point: String,
    fs_type: String,
    source: String,
}

/// Usage figures derived from raw statvfs block counts.
#[derive(Debug, Clone, Copy)]
struct UsageFigures {
    total: u64,
    free: u64,
    available: u64,
    used: u64,
    used_percent: f64,
}

/// Storage usage reader over a list of filesystem paths.
pub struct StorageUsage {
    paths: Vec<String>,
    mount_table: PathBuf,
}

impl StorageUsage {
    pub fn new(paths: Vec<String>) -> Self {
        Self {
            paths,
            mount_table: PathBuf::from(DEFAULT_MOUNTINFO_PATH),
        }
    }

    /// Override the mount table source (used by tests).
    pub fn with_mount_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.mount_table = path.into();
        self
    }
}

impl Collector for StorageUsage {
    fn id(&self) -> &'static str {
        "storage_usage"
    }

    fn collect(&self) -> Result<Vec<Sample>, CollectError> {
        let paths: Vec<&str> = if self.paths.is_empty() {
            vec!["/"]
        } else {
            self.paths.iter().map(String::as_str).collect()
        };

        // Mount labels are best-effort: an unreadable mount table only costs
        // the labels, never the samples.
        let mounts = fs::read_to_string(&self.mount_table)
            .map(|content| parse_mount_table(&content))
            .unwrap_or_default();

        let now = Utc::now();
        let mut out = Vec::with_capacity(paths.len() * 5);
        let mut last_err: Option<CollectError> = None;

        for path in paths {
            let path = path.trim();
            if path.is_empty() {
                continue;
            }
            let path = clean_path(path);

            let stat = match statvfs(&path) {
                Ok(stat) => stat,
                Err(e) => {
                    last_err = Some(CollectError::Statvfs {
                        path: PathBuf::from(&path),
                        source: e,
                    });
                    continue;
                }
            };

            let figures = usage_figures(
                stat.f_frsize as u64,
                stat.f_blocks as u64,
                stat.f_bfree as u64,
                stat.f_bavail as u64,
            );

            let mut labels = HashMap::new();
            labels.insert("path".to_string(), path.clone());
            if let Some(mount) = best_mount(&mounts, &path) {
                if !mount.mount_point.is_empty() {
                    labels.insert("mount_point".to_string(), mount.mount_point.clone());
                }
                if !mount.fs_type.is_empty() {
                    labels.insert("fs_type".to_string(), mount.fs_type.clone());
                }
                if !mount.source.is_empty() {
                    labels.insert("source".to_string(), mount.source.clone());
                }
            }

            let sample = |name: &str, value: f64, unit: &str| Sample {
                name: name.to_string(),
                value,
                unit: unit.to_string(),
                timestamp: Some(now),
                labels: labels.clone(),
            };

            out.push(sample("storage_total_bytes", figures.total as f64, "bytes"));
            out.push(sample("storage_free_bytes", figures.free as f64, "bytes"));
            out.push(sample(
                "storage_available_bytes",
                figures.available as f64,
                "bytes",
            ));
            out.push(sample("storage_used_bytes", figures.used as f64, "bytes"));
            out.push(sample(
                "storage_used_percent",
                figures.used_percent,
                "percent",
            ));
        }

        if out.is_empty() {
            return Err(last_err.unwrap_or(CollectError::NoPaths));
        }
        Ok(out)
    }
}

/// statvfs(3) wrapper returning the raw struct.
fn statvfs(path: &str) -> io::Result<libc::statvfs> {
    let c_path = CString::new(path)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL byte"))?;

    unsafe {
        let mut stat: libc::statvfs = mem::zeroed();
        if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(stat)
    }
}

/// Derive byte figures from block counts.
///
/// `used_percent` is computed against the available count rather than the
/// free count, matching what an unprivileged `df` reports.
fn usage_figures(block_size: u64, blocks: u64, bfree: u64, bavail: u64) -> UsageFigures {
    let total = blocks * block_size;
    let free = bfree * block_size;
    let available = bavail * block_size;
    let used = total.saturating_sub(free);

    let used_percent = if total > 0 {
        total.saturating_sub(available) as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    UsageFigures {
        total,
        free,
        available,
        used,
        used_percent,
    }
}

/// Parse a mountinfo-format table.
///
/// Each line splits on the literal `" - "` separator; the mount point is the
/// fifth field of the left block, the filesystem type and backing device are
/// the first two fields of the right block. Malformed lines are skipped.
fn parse_mount_table(content: &str) -> Vec<MountEntry> {
    let mut entries = Vec::new();

    for line in content.lines() {
        let Some((left, right)) = line.split_once(" - ") else {
            continue;
        };

        let left: Vec<&str> = left.split_whitespace().collect();
        let right: Vec<&str> = right.split_whitespace().collect();
        if left.len() < 5 || right.len() < 2 {
            continue;
        }

        entries.push(MountEntry {
            mount_point: unescape_octal(left[4]),
            fs_type: right[0].to_string(),
            source: unescape_octal(right[1]),
        });
    }

    entries
}

/// Select the best mount entry for a path.
///
/// A candidate matches on exact equality, as the root mount, or as a
/// directory-boundary prefix (`/boot` matches `/boot/firmware` but not
/// `/bootleg`). The longest mount point wins.
fn best_mount<'a>(mounts: &'a [MountEntry], path: &str) -> Option<&'a MountEntry> {
    let mut best: Option<&MountEntry> = None;
    let mut best_len = 0;

    for entry in mounts {
        let mp = entry.mount_point.as_str();
        if mp.is_empty() {
            continue;
        }

        let is_prefix = path
            .strip_prefix(mp)
            .is_some_and(|rest| rest.starts_with('/'));
        let matches = path == mp || (mp == "/" && path.starts_with('/')) || is_prefix;

        if matches && mp.len() > best_len {
            best = Some(entry);
            best_len = mp.len();
        }
    }

    best
}

/// Decode mountinfo octal byte escapes (`\040` is a space).
///
/// Escapes need exactly three octal digits; anything else passes through
/// literally.
fn unescape_octal(s: &str) -> String {
    if !s.contains('\\') {
        return s.to_string();
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 3 >= bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let (o1, o2, o3) = (bytes[i + 1], bytes[i + 2], bytes[i + 3]);
        let octal = |b: u8| (b'0'..=b'7').contains(&b);
        if !octal(o1) || !octal(o2) || !octal(o3) {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let value =
            (o1 - b'0') as u32 * 64 + (o2 - b'0') as u32 * 8 + (o3 - b'0') as u32;
        out.push(value as u8);
        i += 4;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Lexical path cleanup: collapse `.` and `..`, drop trailing separators.
fn clean_path(path: &str) -> String {
    let mut cleaned = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other),
        }
    }

    let cleaned = cleaned.to_string_lossy().into_owned();
    if cleaned.is_empty() {
        ".".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MOUNTINFO: &str = "\
36 25 8:1 / / rw,relatime shared:1 - ext4 /dev/sda1 rw,errors=remount-ro
40 36 8:2 / /boot rw,relatime shared:2 - vfat /dev/sda2 rw
42 36 8:17 / /mnt/My\\040Disk rw,relatime shared:3 - ext4 /dev/sdb1 rw
junk line without separator
";

    #[test]
    fn octal_escapes_decode_to_bytes() {
        assert_eq!(unescape_octal("\\040"), " ");
        assert_eq!(unescape_octal("/mnt/My\\040Disk"), "/mnt/My Disk");
        assert_eq!(unescape_octal("/plain/path"), "/plain/path");
        // Too short or non-octal escapes pass through literally.
        assert_eq!(unescape_octal("\\04"), "\\04");
        assert_eq!(unescape_octal("a\\089b"), "a\\089b");
        assert_eq!(unescape_octal("tab\\011end"), "tab\tend");
    }

    #[test]
    fn mount_table_parses_and_unescapes() {
        let mounts = parse_mount_table(MOUNTINFO);
        assert_eq!(mounts.len(), 3);
        assert_eq!(mounts[0].mount_point, "/");
        assert_eq!(mounts[0].fs_type, "ext4");
        assert_eq!(mounts[0].source, "/dev/sda1");
        assert_eq!(mounts[1].mount_point, "/boot");
        assert_eq!(mounts[1].fs_type, "vfat");
        assert_eq!(mounts[2].mount_point, "/mnt/My Disk");
    }

    #[test]
    fn longest_mount_point_wins() {
        let mounts = parse_mount_table(MOUNTINFO);
        let best = best_mount(&mounts, "/boot/firmware").unwrap();
        assert_eq!(best.mount_point, "/boot");

        let best = best_mount(&mounts, "/home/user").unwrap();
        assert_eq!(best.mount_point, "/");
    }

    #[test]
    fn partial_name_prefix_is_rejected() {
        // "/bo" is not a directory-boundary prefix match for "/boot".
        let mounts = vec![MountEntry {
            mount_point: "/boot".to_string(),
            fs_type: "vfat".to_string(),
            source: "/dev/sda2".to_string(),
        }];
        assert!(best_mount(&mounts, "/bo").is_none());
        assert!(best_mount(&mounts, "/bootleg").is_none());
        assert!(best_mount(&mounts, "/boot").is_some());
    }

    #[test]
    fn used_percent_uses_available_blocks() {
        let figures = usage_figures(1, 1_000_000_000, 300_000_000, 250_000_000);
        assert_eq!(figures.total, 1_000_000_000);
        assert_eq!(figures.used_percent, 75.0);
        assert_eq!(figures.used, 700_000_000);
    }

    #[test]
    fn empty_filesystem_has_zero_percent() {
        let figures = usage_figures(4096, 0, 0, 0);
        assert_eq!(figures.used_percent, 0.0);
        assert_eq!(figures.total, 0);
    }

    #[test]
    fn clean_path_normalizes() {
        assert_eq!(clean_path("/"), "/");
        assert_eq!(clean_path("/boot/"), "/boot");
        assert_eq!(clean_path("/var//log/./journal"), "/var/log/journal");
        assert_eq!(clean_path("/a/b/.."), "/a");
    }

    #[test]
    fn collect_emits_five_samples_per_path() {
        let mut mountinfo = NamedTempFile::new().unwrap();
        write!(mountinfo, "{}", MOUNTINFO).unwrap();

        let collector =
            StorageUsage::new(vec!["/".to_string()]).with_mount_table(mountinfo.path());
        let samples = collector.collect().unwrap();

        assert_eq!(samples.len(), 5);
        let names: Vec<_> = samples.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "storage_total_bytes",
                "storage_free_bytes",
                "storage_available_bytes",
                "storage_used_bytes",
                "storage_used_percent",
            ]
        );
        for sample in &samples {
            assert_eq!(sample.label("path"), Some("/"));
            assert_eq!(sample.label("mount_point"), Some("/"));
            assert_eq!(sample.label("fs_type"), Some("ext4"));
        }
    }

    #[test]
    fn one_failing_path_is_discarded_when_another_succeeds() {
        let collector = StorageUsage::new(vec![
            "/".to_string(),
            "/definitely/not/a/mountpoint/xyz".to_string(),
        ]);

        let samples = collector.collect().unwrap();
        assert_eq!(samples.len(), 5);
        assert!(samples.iter().all(|s| s.label("path") == Some("/")));
    }

    #[test]
    fn all_paths_failing_surfaces_the_last_error() {
        let collector = StorageUsage::new(vec!["/nope/one".to_string(), "/nope/two".to_string()]);
        assert!(matches!(
            collector.collect().unwrap_err(),
            CollectError::Statvfs { .. }
        ));
    }

    #[test]
    fn blank_path_list_is_a_config_error() {
        let collector = StorageUsage::new(vec!["   ".to_string()]);
        assert!(matches!(
            collector.collect().unwrap_err(),
            CollectError::NoPaths
        ));
    }

    #[test]
    fn missing_mount_table_still_emits_samples() {
        let collector =
            StorageUsage::new(vec!["/".to_string()]).with_mount_table("/nonexistent/mountinfo");
        let samples = collector.collect().unwrap();
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0].label("mount_point"), None);
        assert_eq!(samples[0].label("fs_type"), None);
    }
}
