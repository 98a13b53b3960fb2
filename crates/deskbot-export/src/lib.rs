//! deskbot-export - package recorded automation scripts for distribution
//!
//! A recorded project is a `<name>.sikuli` directory holding the script
//! (`<name>.py`) and the template images it references by bare numeric
//! filename. Exporting rewrites those references into the shared image
//! folder, prepends the generator banner and library import, writes the
//! script into the chosen target directory and copies the image assets.

use chrono::Utc;
use deskbot_core::error::{Error, Result};
use log::info;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};

/// Where projects are read from and where exports land.
#[derive(Debug, Clone)]
pub struct ExportLayout {
    /// Directory holding the recorded `<name>.sikuli` projects.
    pub projects_root: PathBuf,
    /// Target directory for module exports (importable package layout).
    pub module_dir: PathBuf,
    /// Target directory for standalone script exports.
    pub script_dir: PathBuf,
    /// Shared folder receiving the copied image assets.
    pub image_dir: PathBuf,
}

impl Default for ExportLayout {
    fn default() -> Self {
        Self {
            projects_root: PathBuf::from("."),
            module_dir: PathBuf::from("deskbot"),
            script_dir: PathBuf::from("scripts"),
            image_dir: PathBuf::from("img"),
        }
    }
}

pub struct Exporter {
    layout: ExportLayout,
}

impl Exporter {
    pub fn new() -> Self {
        Self {
            layout: ExportLayout::default(),
        }
    }

    pub fn with_layout(layout: ExportLayout) -> Self {
        Self { layout }
    }

    /// Export into the module target directory.
    pub fn export_as_module(&self, project: &str) -> Result<bool> {
        let target = self.layout.module_dir.clone();
        self.export(project, &target)
    }

    /// Export into the standalone-script target directory.
    pub fn export_as_script(&self, project: &str) -> Result<bool> {
        let target = self.layout.script_dir.clone();
        self.export(project, &target)
    }

    fn export(&self, project: &str, target: &Path) -> Result<bool> {
        if project.trim().is_empty() {
            return Err(Error::invalid_argument("project name must not be empty"));
        }
        let project_dir = self
            .layout
            .projects_root
            .join(format!("{}.sikuli", project));
        if !project_dir.is_dir() {
            return Err(Error::export_not_found(project));
        }
        let script_path = project_dir.join(format!("{}.py", project));
        if !script_path.is_file() {
            return Err(Error::export_not_found(project));
        }

        let source = fs::read_to_string(&script_path)?;
        let image_folder = self.image_folder_name();
        let rewritten = rewrite_image_refs(&source, &image_folder);
        let header = format!(
            "# Generated by deskbot export {} on {}\nfrom deskbot import *\n\n",
            env!("CARGO_PKG_VERSION"),
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
        );

        fs::create_dir_all(target)?;
        fs::create_dir_all(&self.layout.image_dir)?;
        let out_path = target.join(format!("{}.py", project));
        fs::write(&out_path, format!("{}{}", header, rewritten))?;

        let copied = self.copy_images(&project_dir)?;
        info!(
            "exported {} to {} ({} image(s))",
            project,
            out_path.display(),
            copied
        );
        Ok(out_path.is_file())
    }

    /// Copy every PNG asset of the project into the shared image folder.
    fn copy_images(&self, project_dir: &Path) -> Result<usize> {
        let mut copied = 0;
        for entry in fs::read_dir(project_dir)? {
            let entry = entry?;
            let path = entry.path();
            let is_png = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("png"))
                .unwrap_or(false);
            if !is_png {
                continue;
            }
            if let Some(name) = path.file_name() {
                fs::copy(&path, self.layout.image_dir.join(name))?;
                copied += 1;
            }
        }
        Ok(copied)
    }

    /// Folder name the rewritten script references use; scripts always join
    /// with forward slashes.
    fn image_folder_name(&self) -> String {
        self.layout
            .image_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.layout.image_dir.display().to_string())
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

static IMAGE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(\d+\.png)""#).expect("image reference pattern"));

/// Rewrite bare numeric image references ("16123456789012.png") to the
/// shared-folder form ("img/16123456789012.png"). Non-numeric names are the
/// user's own files and stay untouched.
fn rewrite_image_refs(source: &str, image_folder: &str) -> String {
    IMAGE_REF
        .replace_all(source, |caps: &Captures| {
            format!(r#""{}/{}""#, image_folder, &caps[1])
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskbot_core::error::ErrorCode;

    fn layout(root: &Path) -> ExportLayout {
        ExportLayout {
            projects_root: root.join("projects"),
            module_dir: root.join("deskbot"),
            script_dir: root.join("scripts"),
            image_dir: root.join("img"),
        }
    }

    fn record_project(root: &Path, name: &str, script: &str, images: &[&str]) {
        let dir = root.join("projects").join(format!("{}.sikuli", name));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.py", name)), script).unwrap();
        for image in images {
            fs::write(dir.join(image), b"png").unwrap();
        }
    }

    #[test]
    fn missing_project_fails_with_export_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let exporter = Exporter::with_layout(layout(tmp.path()));
        let err = exporter.export_as_module("ghost").unwrap_err();
        assert_eq!(err.code, ErrorCode::ExportNotFound);
    }

    #[test]
    fn empty_project_name_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let exporter = Exporter::with_layout(layout(tmp.path()));
        let err = exporter.export_as_module(" ").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidArgument);
    }

    #[test]
    fn module_export_writes_banner_import_and_rewritten_refs() {
        let tmp = tempfile::tempdir().unwrap();
        record_project(
            tmp.path(),
            "login",
            "wait(\"16123456789012.png\")\nclick(\"16123456789012.png\")\n",
            &["16123456789012.png"],
        );
        let exporter = Exporter::with_layout(layout(tmp.path()));
        assert!(exporter.export_as_module("login").unwrap());

        let out = fs::read_to_string(tmp.path().join("deskbot").join("login.py")).unwrap();
        assert!(out.starts_with("# Generated by deskbot export"));
        let mut lines = out.lines();
        lines.next();
        assert_eq!(lines.next(), Some("from deskbot import *"));
        assert!(out.contains("wait(\"img/16123456789012.png\")"));
        assert!(!out.contains("(\"16123456789012.png\")"));
        assert!(tmp.path().join("img").join("16123456789012.png").is_file());
    }

    #[test]
    fn script_export_targets_the_script_directory() {
        let tmp = tempfile::tempdir().unwrap();
        record_project(tmp.path(), "smoke", "click(\"99.png\")\n", &["99.png"]);
        let exporter = Exporter::with_layout(layout(tmp.path()));
        assert!(exporter.export_as_script("smoke").unwrap());
        assert!(tmp.path().join("scripts").join("smoke.py").is_file());
        assert!(!tmp.path().join("deskbot").join("smoke.py").exists());
    }

    #[test]
    fn only_numeric_image_names_are_rewritten() {
        let rewritten = rewrite_image_refs(
            "click(\"123.png\")\nclick(\"logo.png\")\nopen(\"123.txt\")",
            "img",
        );
        assert!(rewritten.contains("\"img/123.png\""));
        assert!(rewritten.contains("\"logo.png\""));
        assert!(rewritten.contains("\"123.txt\""));
        assert!(!rewritten.contains("\"img/logo.png\""));
    }
}
