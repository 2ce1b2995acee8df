//! Size-based rotation, compression and retention of stream files
//!
//! When the active file of a stream grows past the split size, the worker
//! renames it to a timestamped backup (`app.log.2025-01-08_10.30.45`) and hands
//! the rest to a [`Rotator`] running on its own thread. The rotator compresses
//! every raw backup of the stream into a `.gz` generation and deletes the
//! oldest generations beyond the retention count.

use super::ensure_dir;
use super::tracker::RotationTracker;
use crate::core::error::{LoggerError, Result};
use crate::core::metrics::EngineMetrics;
use chrono::{DateTime, Local, NaiveDateTime};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;

/// strftime pattern of the backup suffix; fixed width so lexical order is chronological
pub const BACKUP_SUFFIX_FORMAT: &str = "%Y-%m-%d_%H.%M.%S";

const BACKUP_SUFFIX_WIDTH: usize = "YYYY-MM-DD_HH.MM.SS".len();

const COMPRESSED_EXTENSION: &str = ".gz";
const TEMP_EXTENSION: &str = ".tmp";

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| LoggerError::rotation(path.display().to_string(), "No usable file name"))
}

/// Choose the backup path for an active file last modified at `modified`
///
/// Backups created within the same second get a `_NNN` suffix greater than
/// that of every existing sibling, so that they still sort after them.
pub fn backup_path(active: &Path, modified: DateTime<Local>) -> Result<PathBuf> {
    let dir = active.parent().unwrap_or_else(|| Path::new("."));
    let stem = format!("{}.{}", file_name_of(active)?, modified.format(BACKUP_SUFFIX_FORMAT));

    let entries = fs::read_dir(dir).map_err(|e| {
        LoggerError::io_operation(
            "choosing backup name",
            format!("Failed to list '{}'", dir.display()),
            e,
        )
    })?;

    let mut next: Option<u32> = None;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(rest) = name.to_str().and_then(|n| n.strip_prefix(stem.as_str())) else {
            continue;
        };
        let rest = rest.strip_suffix(TEMP_EXTENSION).unwrap_or(rest);
        let rest = rest.strip_suffix(COMPRESSED_EXTENSION).unwrap_or(rest);
        let seq = if rest.is_empty() {
            0
        } else {
            match rest.strip_prefix('_').and_then(|n| n.parse::<u32>().ok()) {
                Some(n) => n,
                None => continue,
            }
        };
        next = Some(next.map_or(seq + 1, |n| n.max(seq + 1)));
    }

    Ok(match next {
        None => dir.join(stem),
        Some(n) => dir.join(format!("{}_{:03}", stem, n)),
    })
}

/// Rename `active` to a backup if it is larger than `split_size`
///
/// Returns the backup path when a rename happened.
pub fn rotate_active(active: &Path, split_size: u64) -> Result<Option<PathBuf>> {
    let metadata = match fs::metadata(active) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(LoggerError::io_operation(
                "checking stream size",
                format!("Cannot access '{}'", active.display()),
                e,
            ))
        }
    };
    if !metadata.is_file() || metadata.len() <= split_size {
        return Ok(None);
    }

    let modified: DateTime<Local> = metadata.modified().unwrap_or_else(|_| SystemTime::now()).into();
    let backup = backup_path(active, modified)?;
    fs::rename(active, &backup).map_err(|e| {
        LoggerError::rotation(
            active.display().to_string(),
            format!("Failed to rename to '{}': {}", backup.display(), e),
        )
    })?;
    Ok(Some(backup))
}

/// Whether `suffix` is `<timestamp>[_NNN][.gz]` as produced by [`backup_path`]
fn is_backup_suffix(suffix: &str) -> bool {
    let suffix = suffix.strip_suffix(COMPRESSED_EXTENSION).unwrap_or(suffix);
    let (stamp, seq) = match suffix.split_once('_') {
        Some((date, rest)) => match rest.split_once('_') {
            Some((time, seq)) => (&suffix[..date.len() + 1 + time.len()], Some(seq)),
            None => (suffix, None),
        },
        None => return false,
    };
    if let Some(seq) = seq {
        if seq.len() < 3 || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }
    stamp.len() == BACKUP_SUFFIX_WIDTH
        && NaiveDateTime::parse_from_str(stamp, BACKUP_SUFFIX_FORMAT).is_ok()
}

/// Whether `file_name` is a backup or generation of the stream file `active_name`
///
/// Only the exact backup suffix counts, so `server.1.log` is not a backup of
/// `server`.
fn is_generation_of(file_name: &str, active_name: &str) -> bool {
    file_name
        .strip_prefix(active_name)
        .and_then(|rest| rest.strip_prefix('.'))
        .is_some_and(is_backup_suffix)
}

/// Every backup and generation of `active`, in no particular order
pub fn list_generations(active: &Path) -> Result<Vec<PathBuf>> {
    let dir = active.parent().unwrap_or_else(|| Path::new("."));
    let active_name = file_name_of(active)?;
    let entries = fs::read_dir(dir).map_err(|e| {
        LoggerError::io_operation(
            "listing generations",
            format!("Failed to list '{}'", dir.display()),
            e,
        )
    })?;

    Ok(entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| is_generation_of(name, &active_name))
        })
        .map(|entry| entry.path())
        .collect())
}

fn is_compressed(path: &Path) -> bool {
    path.to_str().is_some_and(|p| p.ends_with(COMPRESSED_EXTENSION))
}

fn stream_into<R: Read, W: Write>(
    reader: &mut R,
    mut encoder: flate2::write::GzEncoder<W>,
) -> std::io::Result<()> {
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        encoder.write_all(&buffer[..bytes_read])?;
    }
    encoder.finish()?.flush()
}

/// Compress `path` into a `.gz` sibling and delete `path`
///
/// The compressed data is written to a temporary file first and moved into
/// place only once complete; the original is removed last.
pub fn compress_file(path: &Path) -> Result<PathBuf> {
    let gz_path = PathBuf::from(format!("{}{}", path.display(), COMPRESSED_EXTENSION));
    let temp_gz_path = PathBuf::from(format!("{}{}", gz_path.display(), TEMP_EXTENSION));
    let fail = |message: String| LoggerError::rotation(path.display().to_string(), message);

    let input = File::open(path).map_err(|e| fail(format!("Failed to open for compression: {}", e)))?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_gz_path).map_err(|e| {
        fail(format!(
            "Failed to create '{}': {}",
            temp_gz_path.display(),
            e
        ))
    })?;
    let encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    if let Err(e) = stream_into(&mut reader, encoder) {
        let _ = fs::remove_file(&temp_gz_path);
        return Err(fail(format!("Failed to compress: {}", e)));
    }

    fs::rename(&temp_gz_path, &gz_path).map_err(|e| {
        let _ = fs::remove_file(&temp_gz_path);
        fail(format!("Failed to move compressed file into place: {}", e))
    })?;

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed '{}' but failed to remove the original: {}",
            path.display(),
            e
        );
    }
    Ok(gz_path)
}

/// One compression and retention pass over the generations of a stream file
#[derive(Debug)]
pub struct Rotator {
    active: PathBuf,
    keep: usize,
    metrics: Arc<EngineMetrics>,
    tracker: Arc<RotationTracker>,
}

impl Rotator {
    pub fn new(
        active: PathBuf,
        keep: usize,
        metrics: Arc<EngineMetrics>,
        tracker: Arc<RotationTracker>,
    ) -> Self {
        Self {
            active,
            keep,
            metrics,
            tracker,
        }
    }

    /// Run the pass on its own thread, registered with the tracker
    pub fn spawn(self) {
        let guard = self.tracker.begin();
        let active = self.active.clone();
        let spawned = thread::Builder::new()
            .name("stream-logger-rotator".to_string())
            .spawn(move || {
                let _guard = guard;
                self.run();
            });

        if let Err(e) = spawned {
            eprintln!(
                "[LOGGER WARNING] Failed to spawn rotation for {}: {}. \
                 Backups stay uncompressed until the next rotation.",
                active.display(),
                e
            );
        }
    }

    /// Compress raw backups, then prune generations beyond `keep`
    ///
    /// Failures on one backup are reported and skipped; the file stays
    /// uncompressed and does not count as a retained generation.
    pub fn run(&self) {
        let lock = self.tracker.stream_lock(&self.active.display().to_string());
        let _held = lock.lock();

        let generations = match list_generations(&self.active) {
            Ok(generations) => generations,
            Err(e) => {
                eprintln!("[LOGGER ERROR] Rotation skipped: {}", e);
                return;
            }
        };

        let mut retained = Vec::with_capacity(generations.len());
        for path in generations {
            if is_compressed(&path) {
                retained.push(path);
                continue;
            }
            match compress_file(&path) {
                Ok(gz_path) => {
                    self.metrics.record_compressed();
                    retained.push(gz_path);
                }
                Err(e) => {
                    self.metrics.record_compression_failure();
                    eprintln!("[LOGGER ERROR] {}", e);
                }
            }
        }

        retained.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        let excess = retained.len().saturating_sub(self.keep);
        for path in retained.drain(..excess) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    self.metrics.record_pruned();
                }
                Err(e) => eprintln!(
                    "[LOGGER WARNING] Failed to remove old generation {}: {}",
                    path.display(),
                    e
                ),
            }
        }
    }
}

/// Create the parent directory of a stream file
pub(crate) fn ensure_parent(active: &Path, mode: Option<u32>) -> std::io::Result<()> {
    match active.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent, mode),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use flate2::read::GzDecoder;
    use tempfile::tempdir;

    fn at(sec: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2025, 1, 8, 10, 30, sec)
            .single()
            .expect("valid datetime")
    }

    fn rotator(active: PathBuf, keep: usize) -> (Rotator, Arc<EngineMetrics>) {
        let metrics = Arc::new(EngineMetrics::new());
        let rotator = Rotator::new(
            active,
            keep,
            Arc::clone(&metrics),
            Arc::new(RotationTracker::new()),
        );
        (rotator, metrics)
    }

    #[test]
    fn test_backup_path_format() {
        let dir = tempdir().unwrap();
        let active = dir.path().join("app.log");
        let backup = backup_path(&active, at(45)).unwrap();
        assert_eq!(backup, dir.path().join("app.log.2025-01-08_10.30.45"));
    }

    #[test]
    fn test_backup_path_same_second_sorts_after_existing() {
        let dir = tempdir().unwrap();
        let active = dir.path().join("app.log");
        fs::write(dir.path().join("app.log.2025-01-08_10.30.45.gz"), b"").unwrap();

        let first = backup_path(&active, at(45)).unwrap();
        assert_eq!(first, dir.path().join("app.log.2025-01-08_10.30.45_001"));
        fs::write(&first, b"").unwrap();

        let second = backup_path(&active, at(45)).unwrap();
        assert_eq!(second, dir.path().join("app.log.2025-01-08_10.30.45_002"));

        let mut names = vec![
            "app.log.2025-01-08_10.30.45.gz".to_string(),
            "app.log.2025-01-08_10.30.45_002.gz".to_string(),
            "app.log.2025-01-08_10.30.45_001.gz".to_string(),
            "app.log.2025-01-08_10.30.46.gz".to_string(),
        ];
        names.sort();
        assert_eq!(names[0], "app.log.2025-01-08_10.30.45.gz");
        assert_eq!(names[3], "app.log.2025-01-08_10.30.46.gz");
    }

    #[test]
    fn test_rotate_active_below_threshold() {
        let dir = tempdir().unwrap();
        let active = dir.path().join("app.log");
        assert_eq!(rotate_active(&active, 10).unwrap(), None);

        fs::write(&active, b"0123456789").unwrap();
        assert_eq!(rotate_active(&active, 10).unwrap(), None);
        assert!(active.exists());
    }

    #[test]
    fn test_rotate_active_renames() {
        let dir = tempdir().unwrap();
        let active = dir.path().join("app.log");
        fs::write(&active, b"0123456789A").unwrap();

        let backup = rotate_active(&active, 10).unwrap().expect("rotated");
        assert!(!active.exists());
        assert_eq!(fs::read(&backup).unwrap(), b"0123456789A");
        assert!(backup
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("app.log.")));
    }

    #[test]
    fn test_is_generation_of() {
        assert!(is_generation_of("app.log.2025-01-08_10.30.45", "app.log"));
        assert!(is_generation_of("app.log.2025-01-08_10.30.45.gz", "app.log"));
        assert!(!is_generation_of("app.log", "app.log"));
        assert!(!is_generation_of("app.log.old", "app.log"));
        assert!(!is_generation_of("app.log.2025-01-08_10.30.45.gz.tmp", "app.log"));
        assert!(!is_generation_of("app.logger.2025-01-08_10.30.45", "app.log"));
        assert!(is_generation_of("app.log.2025-01-08_10.30.45_001", "app.log"));
        assert!(is_generation_of("app.log.2025-01-08_10.30.45_002.gz", "app.log"));
        assert!(is_generation_of("app.log.2025-01-08_10.30.45_1000.gz", "app.log"));
    }

    #[test]
    fn test_is_generation_of_rejects_other_streams() {
        assert!(!is_generation_of("server.1.log", "server"));
        assert!(!is_generation_of("server.2025.log", "server"));
        assert!(!is_generation_of("server.2025-01-08_10.30.45.log", "server"));
        assert!(!is_generation_of("server.2025-01-08_10.30.45_01", "server"));
        assert!(!is_generation_of("server.2025-13-08_10.30.45", "server"));
        assert!(!is_generation_of("server.2025-01-08_10.30.45_abc", "server"));
    }

    #[test]
    fn test_run_leaves_similarly_named_streams_alone() {
        let dir = tempdir().unwrap();
        let active = dir.path().join("server");
        fs::write(dir.path().join("server.1.log"), b"live data of another stream\n").unwrap();
        fs::write(dir.path().join("server.2025-01-08_10.30.40"), b"old\n").unwrap();
        fs::write(dir.path().join("server.2025-01-08_10.30.41"), b"new\n").unwrap();

        let (rotator, metrics) = rotator(active.clone(), 1);
        rotator.run();

        assert_eq!(
            fs::read(dir.path().join("server.1.log")).unwrap(),
            b"live data of another stream\n"
        );
        assert!(!dir.path().join("server.1.log.gz").exists());
        assert!(dir.path().join("server.2025-01-08_10.30.41.gz").exists());
        assert!(!dir.path().join("server.2025-01-08_10.30.40.gz").exists());
        assert_eq!(metrics.generations_compressed(), 2);
        assert_eq!(metrics.generations_pruned(), 1);
    }

    #[test]
    fn test_run_skips_backup_that_fails_to_compress() {
        let dir = tempdir().unwrap();
        let active = dir.path().join("app.log");
        let broken = dir.path().join("app.log.2025-01-08_10.30.40");
        fs::create_dir(&broken).unwrap();
        for sec in 41..45 {
            let name = format!("app.log.2025-01-08_10.30.{}", sec);
            fs::write(dir.path().join(name), format!("second {}\n", sec)).unwrap();
        }

        let (rotator, metrics) = rotator(active.clone(), 2);
        rotator.run();

        assert!(broken.is_dir(), "Failed backup stays in place");
        assert!(!dir.path().join("app.log.2025-01-08_10.30.40.gz").exists());
        assert!(!dir.path().join("app.log.2025-01-08_10.30.40.gz.tmp").exists());
        let mut compressed: Vec<String> = list_generations(&active)
            .unwrap()
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .filter(|n| n.ends_with(".gz"))
            .collect();
        compressed.sort();
        assert_eq!(
            compressed,
            vec![
                "app.log.2025-01-08_10.30.43.gz".to_string(),
                "app.log.2025-01-08_10.30.44.gz".to_string(),
            ]
        );
        assert_eq!(metrics.compression_failures(), 1);
        assert_eq!(metrics.generations_compressed(), 4);
        assert_eq!(metrics.generations_pruned(), 2);
    }

    #[test]
    fn test_compress_roundtrip() {
        let dir = tempdir().unwrap();
        let backup = dir.path().join("app.log.2025-01-08_10.30.45");
        let content = "2025-01-08 10:30:45 line one\n2025-01-08 10:30:45 line two\n".repeat(100);
        fs::write(&backup, &content).unwrap();

        let gz_path = compress_file(&backup).unwrap();
        assert!(!backup.exists());
        assert!(gz_path.to_str().unwrap().ends_with(".gz"));

        let mut decoded = String::new();
        GzDecoder::new(File::open(&gz_path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn test_compress_missing_file_fails() {
        let dir = tempdir().unwrap();
        let err = compress_file(&dir.path().join("app.log.2025-01-08_10.30.45")).unwrap_err();
        assert!(matches!(err, LoggerError::RotationFailure { .. }));
    }

    #[test]
    fn test_run_compresses_and_prunes() {
        let dir = tempdir().unwrap();
        let active = dir.path().join("app.log");
        for sec in 40..45 {
            let name = format!("app.log.2025-01-08_10.30.{}", sec);
            fs::write(dir.path().join(name), format!("second {}\n", sec)).unwrap();
        }
        fs::write(dir.path().join("other.log.2025-01-08_10.30.40"), b"x").unwrap();

        let (rotator, metrics) = rotator(active.clone(), 2);
        rotator.run();

        let mut remaining: Vec<String> = list_generations(&active)
            .unwrap()
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec![
                "app.log.2025-01-08_10.30.43.gz".to_string(),
                "app.log.2025-01-08_10.30.44.gz".to_string(),
            ]
        );
        assert_eq!(metrics.generations_compressed(), 5);
        assert_eq!(metrics.generations_pruned(), 3);
        assert!(dir.path().join("other.log.2025-01-08_10.30.40").exists());
    }

    #[test]
    fn test_spawn_is_tracked() {
        let dir = tempdir().unwrap();
        let active = dir.path().join("app.log");
        fs::write(dir.path().join("app.log.2025-01-08_10.30.40"), b"data\n").unwrap();

        let tracker = Arc::new(RotationTracker::new());
        let metrics = Arc::new(EngineMetrics::new());
        Rotator::new(active.clone(), 3, Arc::clone(&metrics), Arc::clone(&tracker)).spawn();
        tracker.wait_idle();

        assert_eq!(tracker.pending(), 0);
        assert!(dir.path().join("app.log.2025-01-08_10.30.40.gz").exists());
        assert_eq!(metrics.generations_compressed(), 1);
    }
}
