// this_file: crates/fontval-core/src/report.rs

//! Where report files go, and when they disappear again

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{ReportError, Result};

/// Appended to the font file name to form the report name
pub const REPORT_SUFFIX: &str = ".report.xml";

const UNIQUE_ATTEMPTS: u32 = 64;

static UNIQUE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Report destination policy for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportDestination {
    /// `<desktop>/<font file name>.report.xml`
    UserDesktop,
    /// `<dir>/<font file name>.report.xml`
    FixedDir(PathBuf),
    /// `<font path>.report.xml`
    SameDirAsFont,
    /// A fresh file in the OS temp area, deleted when the run ends
    Temporary,
}

/// A report file the driver created, paired with the font it describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFileEntry {
    pub report: PathBuf,
    pub font: PathBuf,
}

impl ReportDestination {
    pub fn is_temporary(&self) -> bool {
        matches!(self, ReportDestination::Temporary)
    }

    /// The directory every report lands in, when the policy has one
    pub fn directory(&self) -> Result<Option<PathBuf>> {
        match self {
            ReportDestination::UserDesktop => desktop_dir().map(Some).ok_or_else(|| {
                ReportError::NoDestination("cannot locate the user's desktop".into()).into()
            }),
            ReportDestination::FixedDir(dir) => Ok(Some(dir.clone())),
            ReportDestination::Temporary => Ok(Some(std::env::temp_dir())),
            ReportDestination::SameDirAsFont => Ok(None),
        }
    }

    /// Check that a caller-supplied directory accepts new files
    ///
    /// Creates and removes a uniquely named file. Only `FixedDir` is
    /// probed; the other policies surface a bad location when the report
    /// for a font is created, which fails that font alone.
    pub fn probe(&self) -> Result<()> {
        let ReportDestination::FixedDir(dir) = self else {
            return Ok(());
        };
        let dir = dir.clone();
        let probe = create_unique(&dir, "fontval-probe", ".tmp").map_err(|source| {
            ReportError::DirectoryWrite {
                path: dir.clone(),
                source,
            }
        })?;
        fs::remove_file(&probe).map_err(|source| ReportError::DirectoryWrite { path: dir, source })?;
        log::debug!("Probe file {} created and removed", probe.display());
        Ok(())
    }

    /// Report path for `font`
    ///
    /// Temporary destinations create the file exclusively so no two reports
    /// can collide; the others only compute the name.
    pub fn report_path(&self, font: &Path) -> Result<PathBuf> {
        let file_name = font
            .file_name()
            .ok_or_else(|| ReportError::NoDestination(format!("{} has no file name", font.display())))?
            .to_string_lossy();

        match self {
            ReportDestination::SameDirAsFont => {
                let mut path = font.as_os_str().to_owned();
                path.push(REPORT_SUFFIX);
                Ok(PathBuf::from(path))
            }
            ReportDestination::Temporary => {
                let dir = std::env::temp_dir();
                create_unique(&dir, "fontval", REPORT_SUFFIX)
                    .map_err(|source| ReportError::DirectoryWrite { path: dir, source }.into())
            }
            ReportDestination::UserDesktop | ReportDestination::FixedDir(_) => {
                let dir = self.directory()?.unwrap_or_default();
                Ok(dir.join(format!("{file_name}{REPORT_SUFFIX}")))
            }
        }
    }

    /// Delete the reports of a finished run if the policy says they are
    /// temporary; returns how many were removed
    pub fn cleanup(&self, entries: &[ReportFileEntry]) -> usize {
        if !self.is_temporary() {
            return 0;
        }
        entries
            .iter()
            .filter(|entry| match fs::remove_file(&entry.report) {
                Ok(()) => true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => false,
                Err(e) => {
                    log::warn!("Failed to remove {}: {}", entry.report.display(), e);
                    false
                }
            })
            .count()
    }
}

/// The user's desktop directory, from `HOME` or `USERPROFILE`
pub fn desktop_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join("Desktop"))
}

/// Create a new empty file with a name no other call has produced
fn create_unique(dir: &Path, prefix: &str, suffix: &str) -> io::Result<PathBuf> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let pid = std::process::id();

    let mut last_err = None;
    for _ in 0..UNIQUE_ATTEMPTS {
        let n = UNIQUE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("{prefix}-{pid}-{nanos:x}-{n}{suffix}"));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_err = Some(e),
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::AlreadyExists, "no unique name")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FontvalError;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fontval_report_{}_{}",
            std::process::id(),
            UNIQUE_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn same_dir_appends_suffix() {
        let path = ReportDestination::SameDirAsFont
            .report_path(Path::new("/fonts/Demo.ttf"))
            .unwrap();
        assert_eq!(path, PathBuf::from("/fonts/Demo.ttf.report.xml"));
    }

    #[test]
    fn fixed_dir_uses_file_name() {
        let dir = scratch_dir();
        let dest = ReportDestination::FixedDir(dir.clone());
        dest.probe().unwrap();
        let path = dest.report_path(Path::new("/elsewhere/Demo.otf")).unwrap();
        assert_eq!(path, dir.join("Demo.otf.report.xml"));
        assert!(!path.exists());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_fixed_dir_fails_probe() {
        let parent = scratch_dir();
        let err = ReportDestination::FixedDir(parent.join("does-not-exist"))
            .probe()
            .unwrap_err();
        assert!(matches!(
            err,
            FontvalError::Report(ReportError::DirectoryWrite { .. })
        ));
        fs::remove_dir_all(parent).unwrap();
    }

    #[test]
    fn only_fixed_dir_is_probed() {
        // No desktop lookup happens before the run
        assert!(ReportDestination::UserDesktop.probe().is_ok());
        assert!(ReportDestination::SameDirAsFont.probe().is_ok());
        assert!(ReportDestination::Temporary.probe().is_ok());
    }

    #[test]
    fn temporary_reports_are_unique_and_cleaned() {
        let dest = ReportDestination::Temporary;
        let font = Path::new("Demo.ttf");
        let a = dest.report_path(font).unwrap();
        let b = dest.report_path(font).unwrap();
        assert_ne!(a, b);
        assert!(a.exists() && b.exists());
        assert!(a.to_string_lossy().ends_with(REPORT_SUFFIX));

        let entries = [a.clone(), b.clone()].map(|report| ReportFileEntry {
            report,
            font: font.to_path_buf(),
        });
        assert_eq!(dest.cleanup(&entries), 2);
        assert!(!a.exists() && !b.exists());
        assert_eq!(dest.cleanup(&entries), 0);
    }

    #[test]
    fn non_temporary_cleanup_keeps_files() {
        let dir = scratch_dir();
        let report = dir.join("kept.report.xml");
        fs::write(&report, b"<report/>").unwrap();
        let dest = ReportDestination::FixedDir(dir.clone());
        let entries = [ReportFileEntry {
            report: report.clone(),
            font: PathBuf::from("kept"),
        }];
        assert_eq!(dest.cleanup(&entries), 0);
        assert!(report.exists());
        fs::remove_dir_all(dir).unwrap();
    }
}
