//! Local cache store, an embedded SQLite database recording host and screen
//! fingerprints plus screenshot history
//!
//! Image-matching automation silently breaks when the screen geometry of a
//! recorded run changes, so the store keeps one screen row per session and
//! interrupts the operator once when a host accumulates more than one
//! distinct geometry.

use crate::error::{Error, Result};
use crate::host::HostEnv;
use chrono::Utc;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Database file name inside the cache directory.
pub const DB_FILE: &str = "deskbot.db";

/// Operator's answer to the screen-drift confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftDecision {
    Proceed,
    /// Cooperative abort; the session terminates the process cleanly.
    Abort,
}

/// Yes/no confirmation seam for the drift check.
pub trait DriftPrompt {
    fn confirm(&self, message: &str) -> bool;
}

/// Reads y/n from the controlling terminal.
pub struct ConsolePrompt;

impl DriftPrompt for ConsolePrompt {
    fn confirm(&self, message: &str) -> bool {
        eprint!("{} [y/N] ", message);
        let _ = io::stderr().flush();
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim(), "y" | "Y" | "yes" | "YES")
    }
}

/// Handle on the cache database. Connections are opened and closed per
/// operation; nothing is held across calls.
pub struct Cache {
    db_path: PathBuf,
}

impl Cache {
    /// Ensure the cache directory and the three tables exist.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let cache = Self {
            db_path: dir.join(DB_FILE),
        };
        let conn = cache.connect()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS computer (
                 hostname    TEXT PRIMARY KEY,
                 os_type     TEXT NOT NULL,
                 os_version  TEXT NOT NULL,
                 recorded_at TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS screen (
                 hostname    TEXT NOT NULL,
                 width       INTEGER NOT NULL,
                 height      INTEGER NOT NULL,
                 recorded_at TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS screenshot (
                 file        TEXT PRIMARY KEY,
                 hostname    TEXT NOT NULL,
                 text        TEXT NOT NULL,
                 recorded_at TEXT NOT NULL
             );",
        )?;
        Ok(cache)
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path).map_err(Error::from)
    }

    /// Record this host and its current screen geometry, then check for
    /// drift: more than one distinct geometry on file for the hostname means
    /// previously recorded coordinates may no longer line up, and the
    /// operator decides whether to continue.
    pub fn initialize(&self, host: &HostEnv, prompt: &dyn DriftPrompt) -> Result<DriftDecision> {
        let now = Utc::now().to_rfc3339();
        let (width, height) = host
            .primary_geometry()
            .map(|m| (m.width, m.height))
            .unwrap_or((0, 0));

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO computer (hostname, os_type, os_version, recorded_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(hostname) DO UPDATE SET
                 os_type     = excluded.os_type,
                 os_version  = excluded.os_version,
                 recorded_at = excluded.recorded_at",
            params![host.hostname, host.os_type, host.os_version, now],
        )?;
        conn.execute(
            "INSERT INTO screen (hostname, width, height, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![host.hostname, width, height, now],
        )?;

        let distinct: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT width || 'x' || height) FROM screen WHERE hostname = ?1",
            params![host.hostname],
            |row| row.get(0),
        )?;
        if distinct > 1 {
            warn!(
                "screen geometry for {} changed ({} distinct configurations on file)",
                host.hostname, distinct
            );
            let message = format!(
                "The screen configuration of {} has changed since a previous run; \
                 recorded image coordinates may no longer match. Continue anyway?",
                host.hostname
            );
            if !prompt.confirm(&message) {
                return Ok(DriftDecision::Abort);
            }
        }
        Ok(DriftDecision::Proceed)
    }

    /// Upsert one screenshot row.
    pub fn record_screenshot(&self, file: &str, hostname: &str, text: &str) -> Result<()> {
        if file.is_empty() {
            return Err(Error::invalid_argument("screenshot filename must not be empty"));
        }
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO screenshot (file, hostname, text, recorded_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(file) DO UPDATE SET
                 text        = excluded.text,
                 recorded_at = excluded.recorded_at",
            params![file, hostname, text, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Recognized text on file for a screenshot, by filename.
    pub fn screenshot_text(&self, file: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT text FROM screenshot WHERE file = ?1",
            params![file],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    /// Number of screenshot rows on file.
    pub fn screenshot_count(&self) -> Result<i64> {
        let conn = self.connect()?;
        conn.query_row("SELECT COUNT(*) FROM screenshot", [], |row| row.get(0))
            .map_err(Error::from)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Delete the entire cache directory recursively. Returns whether the
    /// directory is absent afterwards. Callers must not hold cache handles
    /// across a purge.
    pub fn purge(dir: &Path) -> Result<bool> {
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(!dir.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MonitorGeometry;
    use std::cell::Cell;

    struct StubPrompt {
        answer: bool,
        asked: Cell<bool>,
    }

    impl StubPrompt {
        fn new(answer: bool) -> Self {
            Self { answer, asked: Cell::new(false) }
        }
    }

    impl DriftPrompt for StubPrompt {
        fn confirm(&self, _message: &str) -> bool {
            self.asked.set(true);
            self.answer
        }
    }

    fn host(width: u32, height: u32) -> HostEnv {
        HostEnv {
            runtime_version: "deskbot 0.1.0".to_string(),
            os_type: "Windows".to_string(),
            os_version: "Windows 10".to_string(),
            machine: "x86_64".to_string(),
            hostname: "bench-1".to_string(),
            monitors: vec![MonitorGeometry { x: 0, y: 0, width, height }],
            locale: "en".to_string(),
        }
    }

    #[test]
    fn first_initialization_never_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let prompt = StubPrompt::new(false);
        let decision = cache.initialize(&host(1920, 1080), &prompt).unwrap();
        assert_eq!(decision, DriftDecision::Proceed);
        assert!(!prompt.asked.get());
    }

    #[test]
    fn same_geometry_twice_never_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let prompt = StubPrompt::new(false);
        cache.initialize(&host(1920, 1080), &prompt).unwrap();
        let decision = cache.initialize(&host(1920, 1080), &prompt).unwrap();
        assert_eq!(decision, DriftDecision::Proceed);
        assert!(!prompt.asked.get());
    }

    #[test]
    fn changed_geometry_prompts_and_respects_the_answer() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        cache.initialize(&host(1920, 1080), &StubPrompt::new(true)).unwrap();

        let yes = StubPrompt::new(true);
        let decision = cache.initialize(&host(1280, 1024), &yes).unwrap();
        assert_eq!(decision, DriftDecision::Proceed);
        assert!(yes.asked.get());

        let no = StubPrompt::new(false);
        let decision = cache.initialize(&host(800, 600), &no).unwrap();
        assert_eq!(decision, DriftDecision::Abort);
        assert!(no.asked.get());
    }

    #[test]
    fn computer_row_is_upserted_not_duplicated() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        cache.initialize(&host(1920, 1080), &StubPrompt::new(true)).unwrap();
        cache.initialize(&host(1920, 1080), &StubPrompt::new(true)).unwrap();
        let conn = Connection::open(cache.db_path()).unwrap();
        let computers: i64 = conn
            .query_row("SELECT COUNT(*) FROM computer", [], |row| row.get(0))
            .unwrap();
        let screens: i64 = conn
            .query_row("SELECT COUNT(*) FROM screen", [], |row| row.get(0))
            .unwrap();
        assert_eq!(computers, 1);
        assert_eq!(screens, 2);
    }

    #[test]
    fn screenshot_rows_upsert_by_filename() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        cache.record_screenshot("16123456789012.png", "bench-1", "").unwrap();
        cache
            .record_screenshot("16123456789012.png", "bench-1", "login screen")
            .unwrap();
        assert_eq!(cache.screenshot_count().unwrap(), 1);
        assert_eq!(
            cache.screenshot_text("16123456789012.png").unwrap().as_deref(),
            Some("login screen")
        );
    }

    #[test]
    fn empty_screenshot_filename_is_rejected_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(dir.path()).unwrap();
        let err = cache.record_screenshot("", "bench-1", "text").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidArgument);
        assert_eq!(cache.screenshot_count().unwrap(), 0);
    }

    #[test]
    fn purge_removes_the_directory_and_reports_absence() {
        let parent = tempfile::tempdir().unwrap();
        let dir = parent.path().join("cache");
        let _ = Cache::open(&dir).unwrap();
        assert!(dir.exists());
        assert!(Cache::purge(&dir).unwrap());
        assert!(!dir.exists());
        // Purging an already-absent directory still reports absence.
        assert!(Cache::purge(&dir).unwrap());
    }
}
