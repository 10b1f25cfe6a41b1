//! Canvas rendering into the terminal cell grid
//!
//! Scales a decoded image to the terminal geometry (doubling the horizontal
//! pixel count to compensate for the taller-than-wide character cell),
//! quantizes it to the dynamic slot budget, and paints it row by row. The
//! full grid of slot indices is built in memory first; the device sees one
//! flush per frame.

use super::palette::MAX_SLOTS;
use super::quantize::quantize;
use super::term::{Session, TermBackend};
use super::Frame;
use crate::error::Result;
use image::DynamicImage;
use image::imageops::FilterType;
use tracing::trace;

/// Compute the output cell grid for an image within a terminal
///
/// The image width is doubled before scaling (row compensation), then
/// `f = min((cols-1) / effective_width, (rows-1) / height)` and both output
/// dimensions are truncated toward zero. Returns `None` when the image has
/// zero area or the geometry leaves no drawable cell.
pub fn scaled_grid(width: u32, height: u32, cols: u16, rows: u16) -> Option<(u16, u16)> {
    if width == 0 || height == 0 || cols < 2 || rows < 2 {
        return None;
    }

    let effective_width = u64::from(width) * 2;
    let height = u64::from(height);
    let avail_w = u64::from(cols - 1);
    let avail_h = u64::from(rows - 1);

    // Truncating integer arithmetic keeps the binding dimension exact.
    let (grid_w, grid_h) = if avail_w * height <= avail_h * effective_width {
        // Width-limited: f = avail_w / effective_width
        (avail_w, avail_w * height / effective_width)
    } else {
        // Height-limited: f = avail_h / height
        (avail_h * effective_width / height, avail_h)
    };

    if grid_w == 0 || grid_h == 0 {
        return None;
    }
    Some((grid_w as u16, grid_h as u16))
}

/// Render one image into the terminal
///
/// Reads the geometry fresh, clears the screen and recycles the slot
/// cache, then paints the scaled and quantized image under the header
/// line. A degenerate image or geometry paints the header only.
pub fn render<B: TermBackend>(
    session: &mut Session<B>,
    img: &DynamicImage,
    header: &str,
) -> Result<()> {
    let (cols, rows) = session.geometry()?;
    session.begin_frame()?;

    if let Some((grid_w, grid_h)) = scaled_grid(img.width(), img.height(), cols, rows) {
        let resized = img
            .resize_exact(u32::from(grid_w), u32::from(grid_h), FilterType::Lanczos3)
            .to_rgb8();
        let frame = quantize(&Frame::from(&resized), MAX_SLOTS);

        trace!(grid_w, grid_h, "Painting image grid");

        // Phase one: resolve every cell's slot in memory
        let mut grid: Vec<Vec<u8>> = Vec::with_capacity(grid_h as usize);
        for y in 0..u32::from(grid_h) {
            let mut row = Vec::with_capacity(grid_w as usize);
            for x in 0..u32::from(grid_w) {
                row.push(session.slot_for(frame.get(x, y))?);
            }
            grid.push(row);
        }

        // Phase two: flush row-major, image starting below the header
        for (y, row) in grid.iter().enumerate() {
            session.draw_row(y as u16 + 1, row)?;
        }
    }

    session.draw_header(header)?;
    session.flush()?;
    Ok(())
}

/// Render a header-only frame (undecodable image, degenerate geometry)
pub fn render_message<B: TermBackend>(session: &mut Session<B>, header: &str) -> Result<()> {
    session.begin_frame()?;
    session.draw_header(header)?;
    session.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::Rgb;
    use crate::viewer::term::testing::RecordingBackend;
    use image::RgbImage;

    #[test]
    fn test_scale_at_80x24_with_200x100_image() {
        // 80x24 terminal, 200x100 image: effective width 400,
        // f = min(79/400, 23/100) = 0.1975, truncated grid (79, 19)
        assert_eq!(scaled_grid(200, 100, 80, 24), Some((79, 19)));
    }

    #[test]
    fn test_scale_truncates_toward_zero() {
        // Height-limited: f = 23/100; 23 * 20 / 100 = 4.6 -> 4
        assert_eq!(scaled_grid(10, 100, 80, 24), Some((4, 23)));
    }

    #[test]
    fn test_scale_degenerate_inputs() {
        assert_eq!(scaled_grid(0, 100, 80, 24), None);
        assert_eq!(scaled_grid(100, 0, 80, 24), None);
        assert_eq!(scaled_grid(100, 100, 1, 24), None);
        assert_eq!(scaled_grid(100, 100, 80, 1), None);
        // So tall that the scaled width truncates to zero cells
        assert_eq!(scaled_grid(1, 10_000, 80, 24), None);
    }

    #[test]
    fn test_render_paints_grid_and_header() {
        let backend = RecordingBackend::new(80, 24);
        let mut session = Session::begin(backend).unwrap();

        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, image::Rgb([10, 20, 30])));
        render(&mut session, &img, "test.png [1/1]").unwrap();

        let backend = session.backend();
        assert_eq!(backend.cleared, 1);
        assert_eq!(backend.flushes, 1);
        assert_eq!(backend.headers, vec!["test.png [1/1]".to_string()]);

        // 19 rows of 79 cells, starting below the header row
        assert_eq!(backend.rows_drawn.len(), 19);
        assert_eq!(backend.rows_drawn[0].0, 1);
        assert_eq!(backend.rows_drawn[18].0, 19);
        assert!(backend.rows_drawn.iter().all(|(_, row)| row.len() == 79));

        // A solid image needs exactly one programmed slot
        assert_eq!(session.allocated_slots(), 1);
    }

    #[test]
    fn test_render_respects_slot_budget() {
        let backend = RecordingBackend::new(120, 60);
        let mut session = Session::begin(backend).unwrap();

        // Noisy gradient with far more distinct colors than slots
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(300, 200, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
        }));
        render(&mut session, &img, "noise").unwrap();

        assert!(session.allocated_slots() <= MAX_SLOTS);
        assert_eq!(session.backend().flushes, 1);
    }

    #[test]
    fn test_render_message_is_header_only() {
        let backend = RecordingBackend::new(80, 24);
        let mut session = Session::begin(backend).unwrap();
        render_message(&mut session, "missing.jpg [2/3] (decode failed)").unwrap();

        let backend = session.backend();
        assert!(backend.rows_drawn.is_empty());
        assert_eq!(backend.headers.len(), 1);
        assert_eq!(backend.programmed, Vec::<(u8, Rgb)>::new());
    }
}
