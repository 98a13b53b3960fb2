//! Screen driver, the seam to the image-matching and input engine
//!
//! The facade validates arguments and decides *what* to do; a
//! [`ScreenDriver`] decides *how* a template is found on screen and how
//! keystrokes reach the OS. Tests substitute recording spies.

pub mod native;

pub use native::NativeDriver;

use crate::error::Result;
use std::path::Path;

/// Keyboard modifier held around a chorded keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Control,
    Alt,
    Shift,
    Meta,
}

/// Image-driven interaction primitives.
pub trait ScreenDriver {
    /// True if the template image is currently visible somewhere on screen.
    fn exists(&mut self, image: &Path) -> Result<bool>;

    /// Click the center of the on-screen match for the template.
    fn click(&mut self, image: &Path) -> Result<()>;

    /// Block until the template appears. The polling cadence and ceiling are
    /// the driver's own; callers get no timeout knob.
    fn wait(&mut self, image: &Path) -> Result<()>;

    /// Press a named key once.
    fn type_key(&mut self, key: &str) -> Result<()>;

    /// Press a named key with modifiers held around it.
    fn key_chord(&mut self, key: &str, modifiers: &[Modifier]) -> Result<()>;
}
