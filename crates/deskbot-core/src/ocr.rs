//! Text recognition over image files via the tesseract CLI

use crate::error::{Error, Result};
use anyhow::Context;
use std::path::Path;
use std::process::Command;

/// Languages the recognizer accepts, as traineddata identifiers.
pub const SUPPORTED_LANGUAGES: &[&str] = &["eng", "fra", "deu", "spa", "ita", "por"];

/// Recognition engine seam.
pub trait TextRecognizer {
    fn recognize(&self, image: &Path, language: &str) -> Result<String>;
}

/// Shells out to the `tesseract` executable.
pub struct TesseractCli;

impl TextRecognizer for TesseractCli {
    fn recognize(&self, image: &Path, language: &str) -> Result<String> {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .args(["-l", language])
            .output()
            .context("failed to run tesseract")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::action_failed("recognition", stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Reject languages outside the supported set before any engine call.
pub fn check_language(language: &str) -> Result<()> {
    if SUPPORTED_LANGUAGES.contains(&language) {
        Ok(())
    } else {
        Err(Error::unsupported_language(language, SUPPORTED_LANGUAGES))
    }
}
