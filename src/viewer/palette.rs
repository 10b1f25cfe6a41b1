//! Terminal color slot allocation
//!
//! Maps quantized RGB colors to indexed terminal palette slots. The first
//! 16 indices are reserved for standard ANSI colors (header and default
//! text styling); dynamic image colors occupy the remaining 240. The
//! allocator never exceeds that budget: once full, a new color falls back
//! to the nearest already-allocated slot.

use super::Rgb;
use std::collections::BTreeMap;
use std::collections::HashMap;

/// Total number of indexed palette entries
pub const PALETTE_SIZE: usize = 256;

/// Palette indices reserved for standard ANSI colors (UI text styling)
pub const RESERVED_SLOTS: usize = 16;

/// Maximum number of dynamic color slots per frame
pub const MAX_SLOTS: usize = PALETTE_SIZE - RESERVED_SLOTS;

/// One allocated terminal color slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSlot {
    /// Palette index this slot occupies
    pub index: u8,
    /// Color currently programmed into the slot
    pub rgb: Rgb,
    /// Pre-session contents of the slot (xterm-256 default entry)
    pub original_rgb: Rgb,
}

/// Result of a slot lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRequest {
    /// Color already has a slot (or fell back to the nearest one);
    /// no terminal writes required
    Hit(u8),
    /// A new slot was allocated; the terminal register at `index` must be
    /// programmed to the requested color
    Allocated { index: u8, original_rgb: Rgb },
}

/// Bidirectional cache of quantized colors to palette indices
///
/// Holds the slot table for one frame. `reset` clears the table between
/// frames so indices can be recycled for a new image's palette; within a
/// frame a color never moves to a different slot.
#[derive(Debug, Default)]
pub struct SlotAllocator {
    slots: Vec<ColorSlot>,
    by_rgb: HashMap<Rgb, u8>,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocated slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Allocated slots in allocation order
    pub fn slots(&self) -> &[ColorSlot] {
        &self.slots
    }

    /// Look up or allocate a slot for a quantized color
    ///
    /// Cache hits return the existing index without side effects. When the
    /// table is full, the nearest allocated color by squared RGB distance
    /// is reused rather than failing the render.
    pub fn lookup(&mut self, rgb: Rgb) -> SlotRequest {
        if let Some(&index) = self.by_rgb.get(&rgb) {
            return SlotRequest::Hit(index);
        }

        if self.slots.len() < MAX_SLOTS {
            let index = (RESERVED_SLOTS + self.slots.len()) as u8;
            let original_rgb = xterm_default(index);
            self.slots.push(ColorSlot {
                index,
                rgb,
                original_rgb,
            });
            self.by_rgb.insert(rgb, index);
            return SlotRequest::Allocated {
                index,
                original_rgb,
            };
        }

        SlotRequest::Hit(self.nearest(rgb))
    }

    /// Nearest allocated slot by squared RGB distance
    fn nearest(&self, rgb: Rgb) -> u8 {
        self.slots
            .iter()
            .min_by_key(|s| s.rgb.distance_sq(rgb))
            .map(|s| s.index)
            .unwrap_or(RESERVED_SLOTS as u8)
    }

    /// Clear the slot table for the next frame
    ///
    /// Indices are recycled across frames; the session snapshot keeps its
    /// record of every index that was ever programmed.
    pub fn reset(&mut self) {
        self.slots.clear();
        self.by_rgb.clear();
    }
}

/// Pre-session palette contents, consumed at teardown
///
/// Records, for every palette index the session programs, the xterm-256
/// default entry that occupied it. Each index is captured once, at its
/// first overwrite, no matter how many frames reuse it.
#[derive(Debug, Default)]
pub struct SessionSnapshot {
    entries: BTreeMap<u8, Rgb>,
}

impl SessionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pre-overwrite contents of a slot (first write wins)
    pub fn record(&mut self, index: u8, original_rgb: Rgb) {
        self.entries.entry(index).or_insert(original_rgb);
    }

    /// Recorded `(index, original_rgb)` pairs in index order
    pub fn entries(&self) -> impl Iterator<Item = (u8, Rgb)> + '_ {
        self.entries.iter().map(|(&i, &rgb)| (i, rgb))
    }

    /// Drop all recorded entries once restoration has run
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Default xterm-256 palette entry for an index
///
/// Indices 0-15 are the standard colors, 16-231 the 6x6x6 color cube and
/// 232-255 the grayscale ramp. Used as the recorded pre-session contents
/// of a slot, since ANSI terminals cannot be queried for palette state.
pub fn xterm_default(index: u8) -> Rgb {
    const STANDARD: [(u8, u8, u8); 16] = [
        (0, 0, 0),
        (128, 0, 0),
        (0, 128, 0),
        (128, 128, 0),
        (0, 0, 128),
        (128, 0, 128),
        (0, 128, 128),
        (192, 192, 192),
        (128, 128, 128),
        (255, 0, 0),
        (0, 255, 0),
        (255, 255, 0),
        (0, 0, 255),
        (255, 0, 255),
        (0, 255, 255),
        (255, 255, 255),
    ];

    match index {
        0..=15 => {
            let (r, g, b) = STANDARD[index as usize];
            Rgb::new(r, g, b)
        }
        16..=231 => {
            let i = index - 16;
            let levels = [i / 36, (i / 6) % 6, i % 6];
            let ch = levels.map(|l| if l == 0 { 0 } else { 55 + l * 40 });
            Rgb::new(ch[0], ch[1], ch[2])
        }
        232..=255 => {
            let gray = 8 + (index - 232) * 10;
            Rgb::new(gray, gray, gray)
        }
    }
}
