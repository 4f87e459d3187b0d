use crate::error::{Error, Result};
use std::process::Command;

/// Opens links for the browser destination. Output code goes through this
/// so tests can record the calls instead of spawning a process.
pub trait BrowserLauncher {
    fn open(&self, url: &str) -> Result<()>;
}

/// The platform browser, via `open_new_tab`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        open_new_tab(url)
    }
}

/// Opens a URL in a new browser tab using the platform's opener.
/// - macOS: `open`
/// - Linux: `xdg-open`
/// - Windows: `cmd /C start`
pub fn open_new_tab(url: &str) -> Result<()> {
    let mut command = opener(url)?;
    let status = command
        .status()
        .map_err(|e| Error::Browser(format!("Failed to launch browser: {}", e)))?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::Browser(format!("browser opener exited with {}", status)))
    }
}

#[cfg(target_os = "macos")]
fn opener(url: &str) -> Result<Command> {
    let mut command = Command::new("open");
    command.arg(url);
    Ok(command)
}

#[cfg(target_os = "linux")]
fn opener(url: &str) -> Result<Command> {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    Ok(command)
}

#[cfg(target_os = "windows")]
fn opener(url: &str) -> Result<Command> {
    let mut command = Command::new("cmd");
    // The empty string is the window title `start` expects first.
    command.args(["/C", "start", "", url]);
    Ok(command)
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn opener(_url: &str) -> Result<Command> {
    Err(Error::Browser(
        "Opening a browser is not supported on this platform".to_string(),
    ))
}
