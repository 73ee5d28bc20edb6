//! Where a rendered figure ends up.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Destination of the figure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write to this path at export resolution.
    File(PathBuf),
    /// Write to a temporary PNG, optionally opening a viewer on it.
    Preview { open: bool },
}

impl OutputTarget {
    /// Target for the `--output` / `--no-open` combination.
    pub fn from_args(output: Option<&Path>, no_open: bool) -> Self {
        match output {
            Some(path) => OutputTarget::File(path.to_path_buf()),
            None => OutputTarget::Preview { open: !no_open },
        }
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, OutputTarget::Preview { .. })
    }

    /// Path the renderer should write to.
    ///
    /// Preview files are kept on disk after the process exits so the viewer
    /// can still read them.
    pub fn resolve_path(&self) -> Result<PathBuf> {
        match self {
            OutputTarget::File(path) => Ok(path.clone()),
            OutputTarget::Preview { .. } => {
                let temp = tempfile::Builder::new()
                    .prefix("pfplot-")
                    .suffix(".png")
                    .tempfile()
                    .context("Failed to create preview file")?;
                let path = temp
                    .into_temp_path()
                    .keep()
                    .context("Failed to keep preview file")?;
                debug!("Preview file: {}", path.display());
                Ok(path)
            }
        }
    }

    /// Post-render step: open the viewer for previews.
    ///
    /// A viewer that cannot be launched is reported, not fatal.
    pub fn finish(&self, path: &Path) {
        if let OutputTarget::Preview { open: true } = self {
            if let Err(e) = open_viewer(path) {
                warn!("Could not open image viewer: {}", e);
            }
        }
    }
}

/// Launch the platform's default image viewer on `path`.
fn open_viewer(path: &Path) -> Result<()> {
    let mut command = viewer_command(path);
    debug!("Opening viewer: {:?}", command);

    let status = command
        .status()
        .with_context(|| format!("Failed to launch viewer for {}", path.display()))?;

    if !status.success() {
        anyhow::bail!("viewer exited with {}", status);
    }
    Ok(())
}

fn viewer_command(path: &Path) -> Command {
    if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(path);
        command
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]).arg(path);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(path);
        command
    }
}
