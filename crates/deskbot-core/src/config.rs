//! Session configuration, built once at construction and passed by reference

use std::path::PathBuf;

/// Everything the session reads from its surroundings, fixed up front.
///
/// Ambient process state (current locale, command lookup) is resolved into
/// this struct and [`crate::host::HostEnv`] exactly once, at session start.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Gate for every write to the cache store, for the session's lifetime.
    pub cache_enabled: bool,
    /// Cache storage directory; the database file lives inside it.
    pub cache_dir: PathBuf,
    /// Shared folder for captured PNG files and exported image assets.
    pub image_dir: PathBuf,
    /// Default recognition language when the caller passes none.
    pub ocr_language: String,
    /// Directory holding the scrcpy/adb binaries.
    pub scrcpy_dir: PathBuf,
    /// Device-listing program name inside `scrcpy_dir`.
    pub adb_program: String,
    /// Mirroring program name inside `scrcpy_dir`.
    pub scrcpy_program: String,
    /// Seconds a freshly opened website gets to settle before the
    /// full-screen toggle keystroke is sent.
    pub web_warmup_secs: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_dir: PathBuf::from("cache"),
            image_dir: PathBuf::from("img"),
            ocr_language: "eng".to_string(),
            scrcpy_dir: PathBuf::from("scrcpy-windows"),
            adb_program: "adb.exe".to_string(),
            scrcpy_program: "scrcpy.exe".to_string(),
            web_warmup_secs: 3.0,
        }
    }
}
