//! deskbot-core - Windows GUI-automation sessions
//!
//! One automaton object per test script: image-driven click/wait/type
//! primitives, OS process control, screen capture with text recognition, a
//! local cache store that flags screen-configuration drift, and Android
//! mirroring conveniences.
//!
//! ## Platform Support
//!
//! - **Windows**: full support (verified command templates)
//! - **Linux / macOS**: session construction fails; process-control
//!   templates answer `UNSUPPORTED_PLATFORM` until verified commands are
//!   supplied

pub mod android;
pub mod cache;
pub mod capture;
pub mod config;
pub mod driver;
pub mod error;
pub mod host;
pub mod ocr;
pub mod session;
pub mod shell;

pub use android::{AndroidDevice, DeviceKey};
pub use cache::{Cache, ConsolePrompt, DriftDecision, DriftPrompt};
pub use capture::{CaptureResult, Region, ScreenSource, XcapScreen};
pub use config::SessionConfig;
pub use driver::{Modifier, NativeDriver, ScreenDriver};
pub use error::{Error, ErrorCode, Result};
pub use host::{HostEnv, MonitorGeometry};
pub use ocr::{TesseractCli, TextRecognizer, SUPPORTED_LANGUAGES};
pub use session::{Session, SessionBuilder};
pub use shell::{CommandRunner, SystemShell};

pub mod prelude {
    pub use crate::android::{AndroidDevice, DeviceKey};
    pub use crate::cache::{Cache, DriftDecision, DriftPrompt};
    pub use crate::capture::{CaptureResult, Region};
    pub use crate::config::SessionConfig;
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::host::{HostEnv, MonitorGeometry};
    pub use crate::session::{Session, SessionBuilder};
}
