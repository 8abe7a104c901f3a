//! Still-image I/O through the `image` crate.

use std::path::Path;

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Decodes an image file into an RGB frame at its natural resolution.
pub fn read_image(path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)?.to_rgb8();
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, 3, 0))
}

/// Writes an RGB or RGBA frame; the format follows the file extension.
pub fn write_image(path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let (w, h, data) = (frame.width(), frame.height(), frame.data().to_vec());
    match frame.channels() {
        3 => image::RgbImage::from_raw(w, h, data)
            .ok_or("Failed to create image from frame data")?
            .save(path)?,
        4 => image::RgbaImage::from_raw(w, h, data)
            .ok_or("Failed to create image from frame data")?
            .save(path)?,
        n => return Err(format!("unsupported channel count {n}").into()),
    }
    Ok(())
}

/// True for paths with a supported still-image extension.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
