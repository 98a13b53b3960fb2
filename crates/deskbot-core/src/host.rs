//! Host environment probe, gathered once at session construction

use crate::capture::ScreenSource;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Placement and size of one monitor on the virtual desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Facts about the machine the automaton runs on.
///
/// Immutable for the session's lifetime; every component reads from this
/// instead of re-querying the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEnv {
    /// Version string of this automation runtime.
    pub runtime_version: String,
    /// OS family name, e.g. "Windows".
    pub os_type: String,
    pub os_version: String,
    /// Machine architecture, e.g. "x86_64".
    pub machine: String,
    pub hostname: String,
    /// One entry per attached monitor.
    pub monitors: Vec<MonitorGeometry>,
    /// Two-letter locale language, read from the environment once.
    pub locale: String,
}

impl HostEnv {
    /// Query the platform once and freeze the answers.
    pub fn probe(screen: &dyn ScreenSource) -> Result<Self> {
        let monitors = screen.monitors()?;
        Ok(Self {
            runtime_version: format!("deskbot {}", env!("CARGO_PKG_VERSION")),
            os_type: sysinfo::System::name().unwrap_or_else(|| "unknown".to_string()),
            os_version: sysinfo::System::long_os_version()
                .unwrap_or_else(|| "unknown".to_string()),
            machine: sysinfo::System::cpu_arch().unwrap_or_else(|| "unknown".to_string()),
            hostname: sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string()),
            monitors,
            locale: locale_from_env(),
        })
    }

    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_windows(&self) -> bool {
        self.os_type == "Windows"
    }

    /// Geometry of the first monitor, the one drift detection fingerprints.
    pub fn primary_geometry(&self) -> Option<&MonitorGeometry> {
        self.monitors.first()
    }
}

/// `LANG=fr_FR.UTF-8` becomes "fr". Read here and never again; callers get
/// the value through [`HostEnv`].
fn locale_from_env() -> String {
    std::env::var("LANG")
        .ok()
        .and_then(|v| v.split(['_', '.']).next().map(str::to_string))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "en".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_geometry_is_first_monitor() {
        let env = HostEnv {
            runtime_version: "deskbot 0.1.0".to_string(),
            os_type: "Windows".to_string(),
            os_version: "Windows 10".to_string(),
            machine: "x86_64".to_string(),
            hostname: "bench-1".to_string(),
            monitors: vec![
                MonitorGeometry { x: 0, y: 0, width: 1920, height: 1080 },
                MonitorGeometry { x: 1920, y: 0, width: 1280, height: 1024 },
            ],
            locale: "en".to_string(),
        };
        assert_eq!(env.monitor_count(), 2);
        assert_eq!(env.primary_geometry().map(|m| m.width), Some(1920));
        assert!(env.is_windows());
    }
}
