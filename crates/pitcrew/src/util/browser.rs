//! Platform-aware browser launching

use anyhow::{Context, Result};
use std::process::{Command, Stdio};

/// Open `url` in the default browser for this platform.
///
/// Spawns and detaches; a browser that takes a while to start should not
/// block the CLI.
pub fn open_url(url: &str) -> Result<()> {
    let mut command = launcher(url);
    command
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to open browser for {url}"))?;
    Ok(())
}

fn launcher(url: &str) -> Command {
    if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        // The empty string is the window title slot of `start`.
        c.args(["/C", "start", "", url]);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    }
}
