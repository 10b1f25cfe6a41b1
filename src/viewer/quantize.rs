//! Adaptive palette quantization
//!
//! Median-cut color reduction: the frame's distinct colors are split into
//! at most `max_colors` boxes along their widest channel, and every pixel
//! is remapped to its box's population-weighted mean. A frame that already
//! fits the bound passes through unchanged.

use super::{Frame, Rgb};
use std::collections::HashMap;

/// Reduce a frame to at most `max_colors` distinct colors
///
/// Pure function: the input frame is not modified and no terminal state is
/// touched. `max_colors` is treated as at least 1.
pub fn quantize(frame: &Frame, max_colors: usize) -> Frame {
    let max_colors = max_colors.max(1);

    let mut counts: HashMap<Rgb, u32> = HashMap::new();
    for &px in &frame.pixels {
        *counts.entry(px).or_insert(0) += 1;
    }

    if counts.len() <= max_colors {
        return frame.clone();
    }

    let boxes = median_cut(counts, max_colors);

    // Every distinct color belongs to exactly one box; map it to the
    // box's representative.
    let mut remap: HashMap<Rgb, Rgb> = HashMap::new();
    for b in &boxes {
        let rep = b.representative();
        for &(color, _) in &b.colors {
            remap.insert(color, rep);
        }
    }

    let pixels = frame.pixels.iter().map(|px| remap[px]).collect();
    Frame::new(frame.width, frame.height, pixels)
}

/// A box of distinct colors with their pixel counts
struct ColorBox {
    colors: Vec<(Rgb, u32)>,
    population: u64,
}

impl ColorBox {
    fn new(colors: Vec<(Rgb, u32)>) -> Self {
        let population = colors.iter().map(|&(_, n)| n as u64).sum();
        Self { colors, population }
    }

    fn splittable(&self) -> bool {
        self.colors.len() > 1
    }

    /// Channel with the widest value range: 0 = r, 1 = g, 2 = b
    fn widest_channel(&self) -> usize {
        let mut min = [255u8; 3];
        let mut max = [0u8; 3];
        for &(c, _) in &self.colors {
            let ch = [c.r, c.g, c.b];
            for i in 0..3 {
                min[i] = min[i].min(ch[i]);
                max[i] = max[i].max(ch[i]);
            }
        }
        let ranges = [max[0] - min[0], max[1] - min[1], max[2] - min[2]];
        (0..3).max_by_key(|&i| ranges[i]).unwrap_or(0)
    }

    /// Split at the population median along the widest channel
    fn split(mut self) -> (ColorBox, ColorBox) {
        let channel = self.widest_channel();
        self.colors.sort_by_key(|&(c, _)| match channel {
            0 => (c.r, c.g, c.b),
            1 => (c.g, c.b, c.r),
            _ => (c.b, c.r, c.g),
        });

        let half = self.population / 2;
        let mut acc = 0u64;
        let mut cut = 0;
        for (i, &(_, n)) in self.colors.iter().enumerate() {
            acc += n as u64;
            if acc >= half {
                cut = i + 1;
                break;
            }
        }
        // Both halves must be non-empty
        let cut = cut.clamp(1, self.colors.len() - 1);

        let right = self.colors.split_off(cut);
        (ColorBox::new(self.colors), ColorBox::new(right))
    }

    /// Population-weighted mean color of the box
    fn representative(&self) -> Rgb {
        let mut r = 0u64;
        let mut g = 0u64;
        let mut b = 0u64;
        let mut n = 0u64;
        for &(c, count) in &self.colors {
            let count = count as u64;
            r += c.r as u64 * count;
            g += c.g as u64 * count;
            b += c.b as u64 * count;
            n += count;
        }
        if n == 0 {
            return Rgb::new(0, 0, 0);
        }
        Rgb::new((r / n) as u8, (g / n) as u8, (b / n) as u8)
    }
}

fn median_cut(counts: HashMap<Rgb, u32>, max_colors: usize) -> Vec<ColorBox> {
    let mut colors: Vec<(Rgb, u32)> = counts.into_iter().collect();
    // Deterministic box contents regardless of hash order
    colors.sort_by_key(|&(c, _)| c);

    let mut boxes = vec![ColorBox::new(colors)];
    while boxes.len() < max_colors {
        // Split the most populous splittable box
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.splittable())
            .max_by_key(|(_, b)| b.population)
            .map(|(i, _)| i);

        let Some(i) = candidate else { break };
        let (left, right) = boxes.swap_remove(i).split();
        boxes.push(left);
        boxes.push(right);
    }
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn distinct(frame: &Frame) -> usize {
        frame.pixels.iter().collect::<HashSet<_>>().len()
    }

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                pixels.push(Rgb::new(
                    (x * 255 / width.max(1)) as u8,
                    (y * 255 / height.max(1)) as u8,
                    ((x + y) % 256) as u8,
                ));
            }
        }
        Frame::new(width, height, pixels)
    }

    #[test]
    fn test_passthrough_under_bound() {
        let frame = Frame::new(
            2,
            1,
            vec![Rgb::new(10, 20, 30), Rgb::new(200, 100, 50)],
        );
        let out = quantize(&frame, 16);
        assert_eq!(out, frame);
    }

    #[test]
    fn test_bound_respected() {
        let frame = gradient_frame(64, 64);
        assert!(distinct(&frame) > 16);
        let out = quantize(&frame, 16);
        assert!(distinct(&out) <= 16);
        assert_eq!(out.width, frame.width);
        assert_eq!(out.height, frame.height);
        assert_eq!(out.pixels.len(), frame.pixels.len());
    }

    #[test]
    fn test_single_color_budget() {
        let frame = gradient_frame(16, 16);
        let out = quantize(&frame, 1);
        assert_eq!(distinct(&out), 1);
    }

    #[test]
    fn test_deterministic() {
        let frame = gradient_frame(32, 32);
        let a = quantize(&frame, 8);
        let b = quantize(&frame, 8);
        assert_eq!(a, b);
    }

    #[test]
    fn test_representatives_inside_gamut() {
        // A two-cluster image quantized to 2 colors should keep the
        // clusters apart: dark pixels stay dark, light pixels stay light.
        let mut pixels = Vec::new();
        for i in 0..50 {
            pixels.push(Rgb::new(i, 0, 0));
            pixels.push(Rgb::new(200 + (i % 20) as u8, 200, 200));
        }
        let frame = Frame::new(100, 1, pixels);
        let out = quantize(&frame, 2);
        assert_eq!(distinct(&out), 2);
        for (orig, quant) in frame.pixels.iter().zip(&out.pixels) {
            if orig.r < 100 {
                assert!(quant.r < 100, "dark pixel mapped to light palette entry");
            } else {
                assert!(quant.r >= 100, "light pixel mapped to dark palette entry");
            }
        }
    }
}
