//! Filesystem operator implementation.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, info, warn};

use super::config::ExecutorConfig;
use super::error::ExecutorError;
use super::traits::FileOperator;
use super::types::{EntryOutcome, ExecutionReport, OutcomeStatus, RollbackResult};
use crate::metrics;
use crate::planner::RenameOperation;
use crate::resolver::MatchPlan;

/// Filesystem based operator.
pub struct FsOperator {
    config: ExecutorConfig,
}

impl FsOperator {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Operator with default configuration (dry run).
    pub fn with_defaults() -> Self {
        Self::new(ExecutorConfig::default())
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Attempts an atomic rename. `Ok(false)` means the paths are on
    /// different filesystems.
    async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(true),
            Err(e) => {
                // EXDEV is 18 on Linux
                if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Copies a file, hashing the bytes read when verification is on.
    async fn copy_file(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<Option<String>, ExecutorError> {
        let copy_failed =
            |e: std::io::Error| ExecutorError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e);

        let source_file = File::open(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExecutorError::SourceNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                copy_failed(e)
            }
        })?;
        let dest_file = File::create(destination).await.map_err(copy_failed)?;

        let mut reader = BufReader::with_capacity(self.config.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(self.config.buffer_size, dest_file);
        let mut hasher = self.config.verify_checksums.then(Sha256::new);
        let mut buffer = vec![0u8; self.config.buffer_size];

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(copy_failed)?;
            if bytes_read == 0 {
                break;
            }
            if let Some(ref mut h) = hasher {
                h.update(&buffer[..bytes_read]);
            }
            writer
                .write_all(&buffer[..bytes_read])
                .await
                .map_err(copy_failed)?;
        }
        writer.flush().await.map_err(copy_failed)?;

        Ok(hasher.map(|h| format!("{:x}", h.finalize())))
    }

    async fn calculate_checksum(&self, path: &Path) -> Result<String, ExecutorError> {
        let checksum_failed = |e: std::io::Error| ExecutorError::ChecksumCalculationFailed {
            path: path.to_path_buf(),
            source: e,
        };

        let file = File::open(path).await.map_err(checksum_failed)?;
        let mut reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut buffer = vec![0u8; self.config.buffer_size];
        let mut hasher = Sha256::new();
        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(checksum_failed)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Copy, verify, then remove the source. A failed copy leaves no
    /// partial destination behind.
    async fn copy_and_remove(&self, source: &Path, destination: &Path) -> Result<(), ExecutorError> {
        let result: Result<(), ExecutorError> = async {
            let expected = self.copy_file(source, destination).await?;
            if let Some(expected) = expected {
                let actual = self.calculate_checksum(destination).await?;
                if actual != expected {
                    return Err(ExecutorError::ChecksumMismatch {
                        path: destination.to_path_buf(),
                        expected,
                        actual,
                    });
                }
            }
            fs::remove_file(source)
                .await
                .map_err(|e| ExecutorError::CleanupFailed {
                    path: source.to_path_buf(),
                    source: e,
                })
        }
        .await;

        if result.is_err() && source.exists() {
            if let Err(e) = fs::remove_file(destination).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %destination.display(), error = %e, "Failed to remove partial copy");
                }
            }
        }
        result
    }

    /// Move a file, falling back to copy across filesystems.
    async fn move_file(&self, source: &Path, destination: &Path) -> Result<(), ExecutorError> {
        if self.config.prefer_atomic_moves {
            match Self::try_atomic_move(source, destination).await {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    debug!(
                        source = %source.display(),
                        destination = %destination.display(),
                        "Cross-device move, copying instead"
                    );
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound && !source.exists() => {
                    return Err(ExecutorError::SourceNotFound {
                        path: source.to_path_buf(),
                    })
                }
                Err(e) => {
                    return Err(ExecutorError::move_failed(
                        source.to_path_buf(),
                        destination.to_path_buf(),
                        e,
                    ))
                }
            }
        }
        self.copy_and_remove(source, destination).await
    }

    /// Checks that an operation can run without changing anything.
    async fn preflight(&self, op: &RenameOperation) -> Result<(), ExecutorError> {
        match fs::metadata(&op.source).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                return Err(ExecutorError::SourceNotFound {
                    path: op.source.clone(),
                })
            }
        }
        if op.is_noop() {
            return Ok(());
        }
        if op.destination.exists() && op.replaces.as_deref() != Some(op.destination.as_path()) {
            return Err(ExecutorError::DestinationExists {
                path: op.destination.clone(),
            });
        }
        Ok(())
    }

    /// Where a replaced subtitle is set aside.
    fn backup_path(&self, path: &Path) -> Result<PathBuf, ExecutorError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ExecutorError::BackupFailed {
                path: path.to_path_buf(),
                reason: "path has no file name".to_string(),
            })?;
        let dir = match &self.config.backup_dir {
            Some(dir) => dir.clone(),
            None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };

        let mut candidate = dir.join(format!("{}.bak", name));
        let mut n = 1;
        while candidate.exists() {
            candidate = dir.join(format!("{}.bak.{}", name, n));
            n += 1;
        }
        Ok(candidate)
    }

    async fn ensure_parent_dir(path: &Path) -> Result<(), ExecutorError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ExecutorError::DirectoryCreationFailed {
                        path: parent.to_path_buf(),
                        source: e,
                    })?;
            }
        }
        Ok(())
    }

    /// Apply one operation. Returns the backup of the replaced file, if any.
    async fn apply(&self, op: &RenameOperation) -> Result<Option<PathBuf>, ExecutorError> {
        self.preflight(op).await?;
        if op.is_noop() {
            return Ok(None);
        }
        Self::ensure_parent_dir(&op.destination).await?;

        let backup = match op.replaces.as_deref() {
            Some(replaced) if replaced.exists() => {
                let backup = self.backup_path(replaced)?;
                Self::ensure_parent_dir(&backup).await?;
                self.move_file(replaced, &backup).await?;
                debug!(replaced = %replaced.display(), backup = %backup.display(), "Backed up replaced subtitle");
                Some(backup)
            }
            _ => None,
        };

        if let Err(e) = self.move_file(&op.source, &op.destination).await {
            if let (Some(backup), Some(replaced)) = (&backup, &op.replaces) {
                if let Err(restore) = self.move_file(backup, replaced).await {
                    warn!(
                        backup = %backup.display(),
                        error = %restore,
                        "Failed to restore replaced subtitle"
                    );
                }
            }
            return Err(e);
        }
        Ok(backup)
    }

    /// Undo one applied operation.
    async fn revert(&self, op: &RenameOperation, backup: Option<&Path>) -> Result<(), ExecutorError> {
        if !op.is_noop() {
            let inverse = op.inverse();
            self.move_file(&inverse.source, &inverse.destination).await?;
        }
        if let (Some(backup), Some(replaced)) = (backup, op.replaces.as_deref()) {
            self.move_file(backup, replaced).await?;
        }
        Ok(())
    }

    /// Revert every applied outcome, newest first.
    async fn revert_outcomes<'a, I>(&self, outcomes: I) -> RollbackResult
    where
        I: Iterator<Item = &'a mut EntryOutcome>,
    {
        let mut result = RollbackResult::default();
        for outcome in outcomes {
            if outcome.status != OutcomeStatus::Applied {
                continue;
            }
            let Some(op) = outcome.operation.as_ref() else {
                continue;
            };
            match self.revert(op, outcome.backup.as_deref()).await {
                Ok(()) => {
                    outcome.status = OutcomeStatus::RolledBack;
                    result.reverted += 1;
                }
                Err(e) => {
                    warn!(source = %op.source.display(), error = %e, "Rollback failed");
                    result.errors.push(format!("{}: {}", op.destination.display(), e));
                }
            }
        }
        result.success = result.errors.is_empty();
        result
    }
}

#[async_trait]
impl FileOperator for FsOperator {
    fn name(&self) -> &str {
        "fs"
    }

    async fn execute(&self, plan: &MatchPlan) -> ExecutionReport {
        let start = Instant::now();
        let mut outcomes: Vec<EntryOutcome> = Vec::with_capacity(plan.len());
        let mut aborted: Option<String> = None;

        for entry in &plan.entries {
            let Some(op) = RenameOperation::from_entry(entry) else {
                outcomes.push(EntryOutcome::new(entry, None, OutcomeStatus::NoOp));
                continue;
            };

            if let Some(reason) = &aborted {
                outcomes.push(EntryOutcome::new(
                    entry,
                    Some(op),
                    OutcomeStatus::Aborted(reason.clone()),
                ));
                continue;
            }

            if self.config.dry_run {
                let status = match self.preflight(&op).await {
                    Ok(()) => OutcomeStatus::WouldApply,
                    Err(e) => OutcomeStatus::Failed(e.to_string()),
                };
                outcomes.push(EntryOutcome::new(entry, Some(op), status));
                continue;
            }

            match self.apply(&op).await {
                Ok(backup) => {
                    info!(
                        source = %op.source.display(),
                        destination = %op.destination.display(),
                        "Renamed subtitle"
                    );
                    let mut outcome = EntryOutcome::new(entry, Some(op), OutcomeStatus::Applied);
                    outcome.backup = backup;
                    outcomes.push(outcome);
                }
                Err(e) => {
                    warn!(
                        source = %op.source.display(),
                        destination = %op.destination.display(),
                        error = %e,
                        "Rename failed"
                    );
                    if self.config.rollback_on_failure {
                        let rollback = self.revert_outcomes(outcomes.iter_mut().rev()).await;
                        info!(
                            reverted = rollback.reverted,
                            errors = rollback.errors.len(),
                            "Rolled back run after failure"
                        );
                        aborted = Some(format!("run aborted after failure on {}", op.source.display()));
                    }
                    outcomes.push(EntryOutcome::new(
                        entry,
                        Some(op),
                        OutcomeStatus::Failed(e.to_string()),
                    ));
                }
            }
        }

        for outcome in &outcomes {
            metrics::FILE_OPERATIONS
                .with_label_values(&[outcome.status.as_str()])
                .inc();
        }

        ExecutionReport {
            dry_run: self.config.dry_run,
            outcomes,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn rollback(&self, report: &ExecutionReport) -> RollbackResult {
        let mut outcomes = report.outcomes.clone();
        let result = self.revert_outcomes(outcomes.iter_mut().rev()).await;
        for _ in 0..result.reverted {
            metrics::FILE_OPERATIONS
                .with_label_values(&["rolled_back"])
                .inc();
        }
        result
    }
}
