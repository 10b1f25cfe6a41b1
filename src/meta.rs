//! EXIF metadata inspection and editing

use crate::error::{Error, Result};
use crate::ops;
use exif::{In, Reader, Tag};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Read the EXIF container from an image file
pub fn read_exif(path: &Path) -> Result<exif::Exif> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| Error::ExifRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// All EXIF fields of an image as `(tag, value)` display pairs
///
/// Covers the primary and thumbnail IFDs, in file order.
pub fn exif_fields(path: &Path) -> Result<Vec<(String, String)>> {
    let exif = read_exif(path)?;
    let fields = exif
        .fields()
        .map(|f| {
            (
                f.tag.to_string(),
                f.display_value().with_unit(&exif).to_string(),
            )
        })
        .collect();
    Ok(fields)
}

/// Number of counter-clockwise quarter turns implied by an EXIF orientation
///
/// Only the four rotation-free-of-mirroring orientations are mapped; the
/// mirrored variants and absent tags leave the image as-is.
pub fn turns_for_orientation(orientation: u32) -> i32 {
    match orientation {
        3 => 2,
        6 => -1,
        8 => 1,
        _ => 0,
    }
}

/// Derive the rotation for an image from its EXIF orientation tag
///
/// Images without readable EXIF rotate zero turns.
pub fn orientation_turns(path: &Path) -> i32 {
    let orientation = read_exif(path).ok().and_then(|exif| {
        exif.get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
    });

    match orientation {
        Some(o) => {
            debug!(path = %path.display(), orientation = o, "EXIF orientation");
            turns_for_orientation(o)
        }
        None => 0,
    }
}

/// Strip EXIF metadata by re-encoding the image in place
pub fn strip_exif(path: &Path) -> Result<()> {
    info!(path = %path.display(), "Stripping EXIF metadata");
    let img = ops::read_image(path)?;
    ops::write_image(&img, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_turns_for_orientation_table() {
        assert_eq!(turns_for_orientation(1), 0);
        assert_eq!(turns_for_orientation(3), 2);
        assert_eq!(turns_for_orientation(6), -1);
        assert_eq!(turns_for_orientation(8), 1);
        // Mirrored and out-of-range values do not rotate
        assert_eq!(turns_for_orientation(2), 0);
        assert_eq!(turns_for_orientation(0), 0);
        assert_eq!(turns_for_orientation(99), 0);
    }

    #[test]
    fn test_orientation_turns_without_exif() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.png");
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])).save(&path).unwrap();
        // PNG written by the image crate carries no EXIF
        assert_eq!(orientation_turns(&path), 0);
    }

    #[test]
    fn test_exif_fields_on_plain_image_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])).save(&path).unwrap();
        assert!(matches!(exif_fields(&path), Err(Error::ExifRead { .. })));
    }

    #[test]
    fn test_strip_exif_keeps_pixels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo.png");
        RgbImage::from_pixel(6, 4, Rgb([10, 20, 30])).save(&path).unwrap();

        strip_exif(&path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!((img.width(), img.height()), (6, 4));
        assert_eq!(img.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }
}
