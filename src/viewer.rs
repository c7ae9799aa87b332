//! Interactive display of a rendered figure.

use std::path::Path;
use std::process::Command;

use image::{ImageFormat, RgbImage};
use log::{debug, info};
use tempfile::NamedTempFile;

use crate::error::{HeatmapError, Result};

/// Receives a rasterized figure and shows it, returning once the user is done.
pub trait Viewer {
    fn display(&mut self, image: &RgbImage, title: &str) -> Result<()>;
}

/// Hands the figure to the platform image viewer through a temporary PNG.
///
/// On macOS (`open -W`) and Windows (`start /WAIT`) the call blocks until the
/// viewer is closed and the PNG is removed afterwards. `xdg-open` returns as
/// soon as the viewer is launched, so on other platforms `display` returns
/// immediately and the PNG is left in the temp directory for the viewer to
/// read.
#[derive(Debug, Default)]
pub struct SystemViewer;

impl SystemViewer {
    pub fn new() -> Self {
        SystemViewer
    }

    /// Whether the platform opener waits for the viewer to close.
    pub fn opener_blocks() -> bool {
        cfg!(any(target_os = "macos", target_os = "windows"))
    }

    fn opener(path: &Path) -> Command {
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg("-W").arg(path);
            cmd
        } else if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "/WAIT", ""]).arg(path);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(path);
            cmd
        }
    }
}

fn write_temp_png(image: &RgbImage) -> Result<NamedTempFile> {
    let file = tempfile::Builder::new().prefix("dendroheatmap-").suffix(".png").tempfile()?;
    image.save_with_format(file.path(), ImageFormat::Png)?;
    Ok(file)
}

impl Viewer for SystemViewer {
    fn display(&mut self, image: &RgbImage, title: &str) -> Result<()> {
        let file = write_temp_png(image)?;
        debug!("Showing '{}' from {:?}", title, file.path());

        let status = SystemViewer::opener(file.path())
            .status()
            .map_err(|e| HeatmapError::Viewer(format!("could not launch image viewer: {}", e)))?;
        if !status.success() {
            return Err(HeatmapError::Viewer(format!("image viewer exited with {}", status)));
        }

        if !SystemViewer::opener_blocks() {
            let (_, path) = file.keep().map_err(|e| HeatmapError::Io(e.error))?;
            info!("Figure left at {:?} for the image viewer", path);
        }
        Ok(())
    }
}
