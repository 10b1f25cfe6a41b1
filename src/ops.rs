//! File-to-file image operations
//!
//! The straightforward half of the tool: each operation decodes one or
//! more images, transforms them through the imaging library and writes
//! the result. Inputs are processed sequentially; output paths default to
//! `<stem><suffix>.<ext>` next to the input unless given explicitly or
//! overwriting in place.

use crate::error::{Error, Result};
use crate::meta;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage, imageops};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Decode an image from disk
pub fn read_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| Error::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Encode an image to disk, format chosen by extension
pub fn write_image(img: &DynamicImage, path: &Path) -> Result<()> {
    img.save(path).map_err(|e| Error::Encode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Insert a suffix before the file extension: `photo.jpg` -> `photo_gray.jpg`
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    path.with_file_name(name)
}

/// Resolve the output path for every input
///
/// `overwrite` writes in place; explicit outputs must match the input
/// count; otherwise each input gets the suffixed default.
pub fn resolve_outputs(
    inputs: &[PathBuf],
    outputs: &[PathBuf],
    overwrite: bool,
    suffix: &str,
) -> Result<Vec<PathBuf>> {
    if overwrite {
        return Ok(inputs.to_vec());
    }
    if outputs.is_empty() {
        return Ok(inputs.iter().map(|p| append_suffix(p, suffix)).collect());
    }
    if outputs.len() != inputs.len() {
        return Err(Error::OutputCountMismatch {
            inputs: inputs.len(),
            outputs: outputs.len(),
        });
    }
    Ok(outputs.to_vec())
}

/// Convert images to grayscale
pub fn gray(inputs: &[PathBuf], outputs: &[PathBuf], overwrite: bool) -> Result<()> {
    let outputs = resolve_outputs(inputs, outputs, overwrite, "_gray")?;
    for (input, output) in inputs.iter().zip(&outputs) {
        info!(input = %input.display(), output = %output.display(), "Graying");
        let img = read_image(input)?;
        let gray = DynamicImage::ImageLuma8(img.to_luma8());
        write_image(&gray, output)?;
    }
    Ok(())
}

/// Resize target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeTarget {
    /// Scale proportionally so the larger dimension equals this
    LargerDimension(u32),
    /// Exact output dimensions
    Exact { width: u32, height: u32 },
}

/// Proportional output dimensions for a `LargerDimension` resize
///
/// `f = size / max(width, height)`, both dimensions truncated.
pub fn proportional_dims(width: u32, height: u32, size: u32) -> (u32, u32) {
    let larger = u64::from(width.max(height)).max(1);
    let w = u64::from(width) * u64::from(size) / larger;
    let h = u64::from(height) * u64::from(size) / larger;
    (w.max(1) as u32, h.max(1) as u32)
}

/// Resize images
pub fn resize(
    inputs: &[PathBuf],
    outputs: &[PathBuf],
    overwrite: bool,
    target: ResizeTarget,
) -> Result<()> {
    let outputs = resolve_outputs(inputs, outputs, overwrite, "_resized")?;
    for (input, output) in inputs.iter().zip(&outputs) {
        let img = read_image(input)?;
        let (w, h) = match target {
            ResizeTarget::Exact { width, height } => (width, height),
            ResizeTarget::LargerDimension(size) => {
                proportional_dims(img.width(), img.height(), size)
            }
        };
        info!(
            input = %input.display(),
            output = %output.display(),
            width = w,
            height = h,
            "Resizing"
        );
        let resized = img.resize_exact(w, h, FilterType::Lanczos3);
        write_image(&resized, output)?;
    }
    Ok(())
}

/// Rotate images by quarter turns
///
/// `k` counts 90-degree counter-clockwise turns. Without an explicit `k`
/// the turn count is derived from the EXIF orientation tag; images without
/// EXIF are written unrotated. Metadata is not carried over to the output.
pub fn rotate(
    inputs: &[PathBuf],
    outputs: &[PathBuf],
    overwrite: bool,
    k: Option<i32>,
) -> Result<()> {
    let outputs = resolve_outputs(inputs, outputs, overwrite, "_rotated")?;
    for (input, output) in inputs.iter().zip(&outputs) {
        let turns = match k {
            Some(k) => k,
            None => meta::orientation_turns(input),
        };
        info!(input = %input.display(), output = %output.display(), turns, "Rotating");
        let img = read_image(input)?;
        let rotated = rotate_ccw(img, turns);
        write_image(&rotated, output)?;
    }
    Ok(())
}

/// Rotate an image by `k` counter-clockwise quarter turns
pub fn rotate_ccw(img: DynamicImage, k: i32) -> DynamicImage {
    match k.rem_euclid(4) {
        1 => img.rotate270(),
        2 => img.rotate180(),
        3 => img.rotate90(),
        _ => img,
    }
}

/// Crop window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    /// Clamp the window to the image bounds
    ///
    /// Fails when the corner itself lies outside the image.
    pub fn clamped(self, image_width: u32, image_height: u32) -> Result<CropWindow> {
        if self.x >= image_width || self.y >= image_height || self.width == 0 || self.height == 0 {
            return Err(Error::CropOutOfBounds {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                image_width,
                image_height,
            });
        }
        Ok(CropWindow {
            x: self.x,
            y: self.y,
            width: self.width.min(image_width - self.x),
            height: self.height.min(image_height - self.y),
        })
    }
}

/// Crop images to a window
pub fn crop(
    inputs: &[PathBuf],
    outputs: &[PathBuf],
    overwrite: bool,
    window: CropWindow,
) -> Result<()> {
    let outputs = resolve_outputs(inputs, outputs, overwrite, "_crop")?;
    for (input, output) in inputs.iter().zip(&outputs) {
        let img = read_image(input)?;
        let w = window.clamped(img.width(), img.height())?;
        info!(
            input = %input.display(),
            output = %output.display(),
            x = w.x, y = w.y, width = w.width, height = w.height,
            "Cropping"
        );
        let cropped = img.crop_imm(w.x, w.y, w.width, w.height);
        write_image(&cropped, output)?;
    }
    Ok(())
}

/// Output dimensions for each stacked image
///
/// Every image is rescaled proportionally so its shared dimension (width
/// for a vertical stack, height for a horizontal one) matches the largest
/// input's.
pub fn stack_dims(sizes: &[(u32, u32)], horizontal: bool) -> Vec<(u32, u32)> {
    let shared = |&(w, h): &(u32, u32)| if horizontal { h } else { w };
    let target = sizes.iter().map(shared).max().unwrap_or(0).max(1);

    sizes
        .iter()
        .map(|&(w, h)| {
            let own = if horizontal { h } else { w }.max(1);
            let t = u64::from(target);
            let sw = (u64::from(w) * t / u64::from(own)).max(1) as u32;
            let sh = (u64::from(h) * t / u64::from(own)).max(1) as u32;
            if horizontal { (sw, target) } else { (target, sh) }
        })
        .collect()
}

/// Join images vertically (default) or horizontally
pub fn stack(inputs: &[PathBuf], output: Option<PathBuf>, horizontal: bool) -> Result<()> {
    if inputs.len() < 2 {
        return Err(Error::NotEnoughInputs {
            needed: 2,
            got: inputs.len(),
        });
    }

    let output = output.unwrap_or_else(|| default_stack_output(inputs));

    let images: Vec<RgbImage> = inputs
        .iter()
        .map(|p| Ok(read_image(p)?.to_rgb8()))
        .collect::<Result<_>>()?;
    let sizes: Vec<(u32, u32)> = images.iter().map(|i| (i.width(), i.height())).collect();
    let dims = stack_dims(&sizes, horizontal);

    let canvas_w = if horizontal {
        dims.iter().map(|d| d.0).sum()
    } else {
        dims[0].0
    };
    let canvas_h = if horizontal {
        dims[0].1
    } else {
        dims.iter().map(|d| d.1).sum()
    };
    debug!(canvas_w, canvas_h, horizontal, "Stacking canvas");

    let mut canvas = RgbImage::new(canvas_w, canvas_h);
    let mut offset = 0u32;
    for (img, &(w, h)) in images.into_iter().zip(&dims) {
        let scaled = if (img.width(), img.height()) == (w, h) {
            img
        } else {
            imageops::resize(&img, w, h, FilterType::Lanczos3)
        };
        let (x, y) = if horizontal { (offset, 0) } else { (0, offset) };
        imageops::replace(&mut canvas, &scaled, i64::from(x), i64::from(y));
        offset += if horizontal { w } else { h };
    }

    info!(output = %output.display(), count = inputs.len(), "Stacked images");
    write_image(&DynamicImage::ImageRgb8(canvas), &output)
}

/// Default stack output: input stems joined with `-`, first input's extension
fn default_stack_output(inputs: &[PathBuf]) -> PathBuf {
    let stems: Vec<String> = inputs
        .iter()
        .map(|p| {
            p.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect();
    let name = match inputs[0].extension() {
        Some(ext) => format!("{}.{}", stems.join("-"), ext.to_string_lossy()),
        None => stems.join("-"),
    };
    inputs[0].with_file_name(name)
}
