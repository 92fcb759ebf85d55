use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{
    browser::engine::BrowserEngine,
    error::{ClaimError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    MacOs,
    Linux,
    Termux,
    Other,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OsFamily::Windows => "Windows",
            OsFamily::MacOs => "macOS",
            OsFamily::Linux => "Linux",
            OsFamily::Termux => "Termux (Android)",
            OsFamily::Other => "Unknown",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct PlatformInfo {
    pub os: OsFamily,
    pub arch: &'static str,
}

impl PlatformInfo {
    pub fn detect() -> Self {
        let os = if is_termux() {
            OsFamily::Termux
        } else {
            match env::consts::OS {
                "windows" => OsFamily::Windows,
                "macos" => OsFamily::MacOs,
                "linux" => OsFamily::Linux,
                _ => OsFamily::Other,
            }
        };

        Self {
            os,
            arch: env::consts::ARCH,
        }
    }

    /// Engines worth probing on this platform, in preference order.
    pub fn supported_engines(&self) -> Vec<BrowserEngine> {
        match self.os {
            OsFamily::Windows => BrowserEngine::PRIORITY.to_vec(),
            OsFamily::MacOs | OsFamily::Linux => vec![BrowserEngine::Chrome, BrowserEngine::Firefox],
            OsFamily::Termux | OsFamily::Other => vec![BrowserEngine::Chrome],
        }
    }

    /// Engines whose WebDriver binary is on `PATH`.
    pub fn installed_engines(&self) -> Vec<BrowserEngine> {
        self.supported_engines()
            .into_iter()
            .filter(|engine| find_on_path(engine.driver_binary()).is_some())
            .collect()
    }

    pub fn default_engine(&self) -> Option<BrowserEngine> {
        self.installed_engines().into_iter().next()
    }

    pub fn user_agent(&self) -> &'static str {
        match self.os {
            OsFamily::Termux => "Mozilla/5.0 (Linux; Android 10; SM-G975F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.120 Mobile Safari/537.36",
            OsFamily::MacOs => "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            OsFamily::Linux => "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            OsFamily::Windows | OsFamily::Other => "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        }
    }
}

/// A pinned engine always wins; otherwise the first installed engine.
pub fn select_engine(pinned: Option<BrowserEngine>, platform: &PlatformInfo) -> Result<BrowserEngine> {
    if let Some(engine) = pinned {
        debug!("Using configured browser engine {}", engine);
        return Ok(engine);
    }

    platform.default_engine().ok_or_else(|| {
        ClaimError::BrowserUnavailable(format!(
            "no WebDriver binary found on PATH for {} (looked for {})",
            platform.os,
            platform
                .supported_engines()
                .iter()
                .map(|e| e.driver_binary())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })
}

fn is_termux() -> bool {
    env::var("PREFIX")
        .map(|prefix| prefix.contains("com.termux"))
        .unwrap_or(false)
        || Path::new("/data/data/com.termux").exists()
}

pub fn find_on_path(binary: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(binary);
        if candidate.is_file() {
            return Some(candidate);
        }
        let exe = dir.join(format!("{}.exe", binary));
        exe.is_file().then_some(exe)
    })
}
