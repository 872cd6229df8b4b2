// crates/sqlite-steward-core/src/backup.rs
// ============================================================================
// Module: Backup and Restore
// Description: Backup, restore, and verify SQLite database files.
// Purpose: Integrity-checked file copies with optional gzip compression,
//          online-backup incrementals, checksums, and rotation.
// Dependencies: rusqlite, flate2, sha2, serde
// ============================================================================

//! ## Overview
//! [`run_backup`] performs one of three operations. Backup verifies the
//! source with the integrity-check pragma, copies it (optionally through a
//! gzip filter or the engine's online backup API), and can checksum,
//! re-verify, and rotate older backups. Restore sniffs the gzip magic from
//! the source and re-verifies the restored file. Verify is the integrity
//! check alone.
//!
//! Rotation is "sort by mtime, unlink the tail": files matching the
//! pattern's directory and file-name prefix are kept newest-first up to the
//! keep count; unlink failures on stale backups are ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;
use std::time::SystemTime;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::backup::Backup;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

use crate::error::ErrorContext;
use crate::error::RawDbError;
use crate::error::StewardError;

// ============================================================================
// SECTION: Request Types
// ============================================================================

/// Gzip magic bytes used to sniff compressed backups.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
/// Pages copied per online-backup step.
const BACKUP_PAGES_PER_STEP: std::os::raw::c_int = 5;

/// Backup operation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupOperation {
    /// Copy the source database to the destination.
    #[default]
    Backup,
    /// Copy a backup file back into place.
    Restore,
    /// Integrity-check the source file.
    Verify,
}

/// Rotation policy applied after a successful backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Number of matching backups to keep.
    pub keep_count: usize,
    /// Directory plus file-name prefix identifying rotatable backups; a
    /// trailing `*` is tolerated and stripped.
    pub pattern: String,
}

/// A backup, restore, or verify request.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    /// Source file path.
    pub src: PathBuf,
    /// Destination file path.
    pub dest: PathBuf,
    /// Operation to perform.
    pub operation: BackupOperation,
    /// Gzip-compress the backup.
    pub compress: bool,
    /// Overwrite an existing destination.
    pub overwrite: bool,
    /// Verify backup integrity after creation.
    pub verify_backup: bool,
    /// Use the engine's online backup API instead of a file copy.
    pub incremental: bool,
    /// Optional rotation of older backups.
    pub rotation: Option<RotationPolicy>,
    /// Record a SHA-256 checksum of the destination.
    pub checksum: bool,
    /// Report the would-be change without touching the filesystem.
    pub check_mode: bool,
}

impl BackupRequest {
    /// Creates a backup request with verification on and no extras.
    pub fn new(src: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            operation: BackupOperation::Backup,
            compress: false,
            overwrite: false,
            verify_backup: true,
            incremental: false,
            rotation: None,
            checksum: false,
            check_mode: false,
        }
    }
}

/// Result record for one backup request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupReport {
    /// Source file path.
    pub src: String,
    /// Destination file path.
    pub dest: String,
    /// Operation performed.
    pub operation: BackupOperation,
    /// Whether any changes were made.
    pub changed: bool,
    /// Whether the backup is compressed.
    pub compressed: bool,
    /// Source file size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_size: Option<u64>,
    /// Destination file size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_size: Option<u64>,
    /// Whether post-operation verification passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    /// Elapsed copy time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_time: Option<f64>,
    /// SHA-256 checksum of the destination, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Files removed by rotation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotated_files: Option<Vec<String>>,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Performs one backup, restore, or verify operation.
///
/// # Errors
///
/// Returns [`StewardError::Validation`] for a missing source or a
/// destination that exists without `overwrite`, [`StewardError::Operation`]
/// when an integrity check fails or the engine rejects the copy, and
/// [`StewardError::Io`] for filesystem failures.
pub fn run_backup(request: &BackupRequest) -> Result<BackupReport, StewardError> {
    let mut report = BackupReport {
        src: request.src.display().to_string(),
        dest: request.dest.display().to_string(),
        operation: request.operation,
        changed: false,
        compressed: request.compress,
        src_size: None,
        dest_size: None,
        verified: None,
        backup_time: None,
        checksum: None,
        rotated_files: None,
    };

    if request.operation != BackupOperation::Verify && !request.src.is_file() {
        return Err(StewardError::Validation(format!(
            "source file does not exist: {}",
            request.src.display()
        )));
    }
    if request.src.is_file() {
        report.src_size = Some(file_size(&request.src));
    }
    let dest_exists = request.dest.is_file();
    if dest_exists {
        report.dest_size = Some(file_size(&request.dest));
        if !request.overwrite && request.operation != BackupOperation::Verify {
            return Err(StewardError::Validation(format!(
                "destination file exists and overwrite is disabled: {}",
                request.dest.display()
            )));
        }
    }

    match request.operation {
        BackupOperation::Backup => run_backup_operation(request, &mut report)?,
        BackupOperation::Restore => run_restore_operation(request, &mut report)?,
        BackupOperation::Verify => {
            let verified = verify_database(&request.src);
            report.verified = Some(verified);
            if !verified {
                return Err(StewardError::Operation(format!(
                    "database integrity check failed: {}",
                    request.src.display()
                )));
            }
        }
    }

    Ok(report)
}

/// Runs the backup path: verify source, copy, checksum, verify, rotate.
fn run_backup_operation(
    request: &BackupRequest,
    report: &mut BackupReport,
) -> Result<(), StewardError> {
    if !verify_database(&request.src) {
        return Err(StewardError::Operation(format!(
            "source database integrity check failed: {}",
            request.src.display()
        )));
    }
    if !request.check_mode {
        let started = Instant::now();
        if request.incremental {
            incremental_backup(&request.src, &request.dest, request.compress)?;
        } else {
            copy_filtered(&request.src, &request.dest, request.compress, false)?;
        }
        report.backup_time = Some(started.elapsed().as_secs_f64());
        report.dest_size = Some(file_size(&request.dest));

        if request.checksum {
            report.checksum = Some(file_checksum(&request.dest)?);
        }
        if request.verify_backup {
            let verified = if request.compress {
                verify_compressed(&request.dest)?
            } else {
                verify_database(&request.dest)
            };
            report.verified = Some(verified);
            if !verified {
                return Err(StewardError::Operation("backup verification failed".to_string()));
            }
        }
        if let Some(rotation) = &request.rotation {
            let rotated = rotate_backups(rotation);
            if !rotated.is_empty() {
                report.rotated_files = Some(rotated);
            }
        }
    }
    report.changed = true;
    Ok(())
}

/// Runs the restore path: sniff compression, copy back, verify.
fn run_restore_operation(
    request: &BackupRequest,
    report: &mut BackupReport,
) -> Result<(), StewardError> {
    let compressed = is_gzip(&request.src);
    report.compressed = compressed;
    if !request.check_mode {
        let started = Instant::now();
        copy_filtered(&request.src, &request.dest, false, compressed)?;
        report.backup_time = Some(started.elapsed().as_secs_f64());
        report.dest_size = Some(file_size(&request.dest));
        if !verify_database(&request.dest) {
            return Err(StewardError::Operation(
                "restored database integrity check failed".to_string(),
            ));
        }
    }
    report.changed = true;
    Ok(())
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Runs the integrity-check pragma and reports pass/fail.
///
/// Open or query failures report as a failed check rather than an error, so
/// corrupt files cannot dodge verification by refusing to open.
#[must_use]
pub fn verify_database(path: &Path) -> bool {
    let Ok(connection) = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
    else {
        return false;
    };
    connection
        .query_row("PRAGMA integrity_check", [], |row| row.get::<_, String>(0))
        .is_ok_and(|status| status == "ok")
}

/// Verifies a gzip-compressed backup by decompressing to a staging file.
fn verify_compressed(path: &Path) -> Result<bool, StewardError> {
    let staging = staging_path(path);
    copy_filtered(path, &staging, false, true)?;
    let verified = verify_database(&staging);
    let _ = fs::remove_file(&staging);
    Ok(verified)
}

// ============================================================================
// SECTION: Copying
// ============================================================================

/// Copies `src` to `dest`, optionally compressing or decompressing.
fn copy_filtered(
    src: &Path,
    dest: &Path,
    compress: bool,
    decompress: bool,
) -> Result<(), StewardError> {
    let copy_error = |err: io::Error| {
        let context = ErrorContext::new()
            .with("src", src.display())
            .with("dest", dest.display());
        StewardError::io("database backup", &RawDbError::Io(err), &context)
    };
    if compress {
        let mut reader = File::open(src).map_err(copy_error)?;
        let writer = File::create(dest).map_err(copy_error)?;
        let mut encoder = GzEncoder::new(writer, Compression::default());
        io::copy(&mut reader, &mut encoder).map_err(copy_error)?;
        encoder.finish().map_err(copy_error)?;
    } else if decompress {
        let reader = File::open(src).map_err(copy_error)?;
        let mut decoder = GzDecoder::new(reader);
        let mut writer = File::create(dest).map_err(copy_error)?;
        io::copy(&mut decoder, &mut writer).map_err(copy_error)?;
    } else {
        fs::copy(src, dest).map_err(copy_error)?;
    }
    Ok(())
}

/// Copies the source through the engine's online backup API, falling back
/// to a plain file copy when the engine rejects either side.
fn incremental_backup(src: &Path, dest: &Path, compress: bool) -> Result<(), StewardError> {
    if compress {
        let staging = staging_path(dest);
        match online_backup(src, &staging) {
            Ok(()) => {
                let result = copy_filtered(&staging, dest, true, false);
                let _ = fs::remove_file(&staging);
                return result;
            }
            Err(_) => {
                let _ = fs::remove_file(&staging);
                return copy_filtered(src, dest, true, false);
            }
        }
    }
    if online_backup(src, dest).is_err() {
        return copy_filtered(src, dest, false, false);
    }
    Ok(())
}

/// Runs the engine's online backup from `src` into `dest`.
fn online_backup(src: &Path, dest: &Path) -> Result<(), rusqlite::Error> {
    let source = Connection::open_with_flags(src, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let mut destination = Connection::open(dest)?;
    let backup = Backup::new(&source, &mut destination)?;
    backup.run_to_completion(BACKUP_PAGES_PER_STEP, std::time::Duration::ZERO, None)?;
    Ok(())
}

/// Returns the staging path used for compressed intermediates.
fn staging_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.partial", path.display()))
}

/// Returns true when the file starts with the gzip magic bytes.
fn is_gzip(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut magic = [0_u8; 2];
    file.read_exact(&mut magic).is_ok_and(|()| magic == GZIP_MAGIC)
}

// ============================================================================
// SECTION: Checksums
// ============================================================================

/// Hex alphabet for checksum rendering.
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Computes the SHA-256 checksum of a file as lowercase hex.
fn file_checksum(path: &Path) -> Result<String, StewardError> {
    let checksum_error = |err: io::Error| {
        let context = ErrorContext::new().with("path", path.display());
        StewardError::io("backup checksum", &RawDbError::Io(err), &context)
    };
    let mut file = File::open(path).map_err(checksum_error)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 4096];
    loop {
        let read = file.read(&mut buffer).map_err(checksum_error)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[.. read]);
    }
    let digest = hasher.finalize();
    let mut rendered = String::with_capacity(digest.len() * 2);
    for byte in digest {
        rendered.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
        rendered.push(char::from(HEX_DIGITS[usize::from(byte & 0x0f)]));
    }
    Ok(rendered)
}

// ============================================================================
// SECTION: Rotation
// ============================================================================

/// Removes stale backups beyond the keep count, newest-first by mtime.
///
/// Unlink failures on stale backups are ignored; only files actually
/// removed are reported.
fn rotate_backups(policy: &RotationPolicy) -> Vec<String> {
    let pattern_path = Path::new(&policy.pattern);
    let Some(directory) = pattern_path.parent() else {
        return Vec::new();
    };
    let Some(file_pattern) = pattern_path.file_name() else {
        return Vec::new();
    };
    let prefix = file_pattern.to_string_lossy().trim_end_matches('*').to_string();
    let Ok(entries) = fs::read_dir(directory) else {
        return Vec::new();
    };

    let mut candidates: Vec<(PathBuf, SystemTime)> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .filter_map(|entry| {
            let path = entry.path();
            if !path.is_file() {
                return None;
            }
            let modified = entry.metadata().ok()?.modified().ok()?;
            Some((path, modified))
        })
        .collect();
    candidates.sort_by(|left, right| right.1.cmp(&left.1));

    let mut removed = Vec::new();
    for (stale, _) in candidates.iter().skip(policy.keep_count) {
        if fs::remove_file(stale).is_ok() {
            removed.push(stale.display().to_string());
        }
    }
    removed
}

/// Returns the file size in bytes, or zero when unavailable.
fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map_or(0, |metadata| metadata.len())
}
