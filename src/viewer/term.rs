//! Terminal backend and session lifecycle
//!
//! `TermBackend` is the seam between the viewer and the terminal device;
//! the production implementation drives crossterm plus OSC 4/104 palette
//! escape sequences. `Session` owns the backend together with the slot
//! allocator and the pre-session palette snapshot, and guarantees the
//! terminal is restored on every exit path.

use super::Rgb;
use super::nav::NavKey;
use super::palette::{SessionSnapshot, SlotAllocator, SlotRequest};
use crate::error::{Error, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor},
    terminal::{
        Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};
use std::io::{self, Stdout, Write};
use std::time::Duration;
use unicode_width::UnicodeWidthChar;

/// Terminal input as seen by the navigation controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// A recognized navigation key
    Key(NavKey),
    /// The terminal was resized; the current image must be repainted
    Resize,
    /// Any other key or event, ignored and re-read
    Other,
}

/// Abstraction over the terminal device
///
/// One implementation drives the real terminal; tests substitute a
/// recording fake. All drawing calls are queued; nothing reaches the
/// device until `flush`.
pub trait TermBackend {
    /// Enter raw, non-echoing mode on the alternate screen
    fn enter(&mut self) -> io::Result<()>;

    /// Leave raw mode and return to the primary screen
    fn leave(&mut self) -> io::Result<()>;

    /// Current geometry as `(cols, rows)`, read fresh per render
    fn size(&self) -> io::Result<(u16, u16)>;

    /// Clear all prior content
    fn clear(&mut self) -> io::Result<()>;

    /// Program the indexed palette register `index` to `rgb`
    fn program_slot(&mut self, index: u8, rgb: Rgb) -> io::Result<()>;

    /// Restore the palette register `index` to its pre-session contents
    fn restore_slot(&mut self, index: u8, rgb: Rgb) -> io::Result<()>;

    /// Re-enable default terminal colors
    fn reset_colors(&mut self) -> io::Result<()>;

    /// Draw the status line on the top row with reserved styling only
    fn draw_header(&mut self, text: &str) -> io::Result<()>;

    /// Draw one image row: one colored space per cell, default styling
    /// restored at the end of the row
    fn draw_row(&mut self, y: u16, slots: &[u8]) -> io::Result<()>;

    /// Flush all queued output to the device
    fn flush(&mut self) -> io::Result<()>;

    /// Wait for input: `None` blocks until an event arrives, `Some(d)`
    /// waits at most `d` and returns `Ok(None)` on timeout
    fn poll_input(&mut self, timeout: Option<Duration>) -> io::Result<Option<InputEvent>>;
}

/// Production backend writing to stdout through crossterm
#[derive(Debug)]
pub struct CrosstermBackend {
    out: Stdout,
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TermBackend for CrosstermBackend {
    fn enter(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        queue!(self.out, EnterAlternateScreen, Hide)?;
        self.out.flush()
    }

    fn leave(&mut self) -> io::Result<()> {
        queue!(self.out, Show, LeaveAlternateScreen)?;
        self.out.flush()?;
        disable_raw_mode()
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        crossterm::terminal::size()
    }

    fn clear(&mut self) -> io::Result<()> {
        queue!(self.out, ResetColor, Clear(ClearType::All))
    }

    fn program_slot(&mut self, index: u8, rgb: Rgb) -> io::Result<()> {
        write!(
            self.out,
            "\x1b]4;{};rgb:{:02x}/{:02x}/{:02x}\x07",
            index, rgb.r, rgb.g, rgb.b
        )
    }

    fn restore_slot(&mut self, index: u8, rgb: Rgb) -> io::Result<()> {
        // Re-program the recorded default, then let the terminal apply its
        // own default for that register as well.
        self.program_slot(index, rgb)?;
        write!(self.out, "\x1b]104;{}\x07", index)
    }

    fn reset_colors(&mut self) -> io::Result<()> {
        queue!(self.out, ResetColor)
    }

    fn draw_header(&mut self, text: &str) -> io::Result<()> {
        let (cols, _) = self.size()?;
        let line = fit_to_width(text, cols as usize);
        queue!(
            self.out,
            MoveTo(0, 0),
            ResetColor,
            SetAttribute(Attribute::Reverse),
            Print(line),
            SetAttribute(Attribute::Reset),
        )
    }

    fn draw_row(&mut self, y: u16, slots: &[u8]) -> io::Result<()> {
        queue!(self.out, MoveTo(0, y))?;
        let mut current: Option<u8> = None;
        for &slot in slots {
            if current != Some(slot) {
                queue!(self.out, SetBackgroundColor(Color::AnsiValue(slot)))?;
                current = Some(slot);
            }
            queue!(self.out, Print(' '))?;
        }
        queue!(self.out, ResetColor)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn poll_input(&mut self, timeout: Option<Duration>) -> io::Result<Option<InputEvent>> {
        match timeout {
            Some(d) => {
                if event::poll(d)? {
                    Ok(Some(map_event(event::read()?)))
                } else {
                    Ok(None)
                }
            }
            None => Ok(Some(map_event(event::read()?))),
        }
    }
}

/// Truncate or pad a header line to the terminal width
fn fit_to_width(text: &str, cols: usize) -> String {
    let mut line = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > cols {
            break;
        }
        line.push(ch);
        used += w;
    }
    while used < cols {
        line.push(' ');
        used += 1;
    }
    line
}

/// Map a crossterm event to viewer input
fn map_event(ev: Event) -> InputEvent {
    match ev {
        Event::Key(key) => map_key(key),
        Event::Resize(_, _) => InputEvent::Resize,
        _ => InputEvent::Other,
    }
}

fn map_key(key: KeyEvent) -> InputEvent {
    if key.kind != KeyEventKind::Press {
        return InputEvent::Other;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
    {
        return InputEvent::Key(NavKey::Quit);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => InputEvent::Key(NavKey::Quit),
        KeyCode::Char('n') | KeyCode::Char('j') | KeyCode::Char(' ')
        | KeyCode::Right | KeyCode::Down | KeyCode::PageDown => InputEvent::Key(NavKey::Next),
        KeyCode::Char('p') | KeyCode::Char('h') | KeyCode::Char('k')
        | KeyCode::Left | KeyCode::Up | KeyCode::PageUp => InputEvent::Key(NavKey::Previous),
        _ => InputEvent::Other,
    }
}

/// One viewing session over the terminal
///
/// Owns the backend, the slot allocator and the pre-session snapshot.
/// `begin` acquires the terminal; `end` restores every programmed slot and
/// the terminal mode, is idempotent, and also runs from `Drop` so error
/// and panic paths cannot leave the terminal corrupted.
#[derive(Debug)]
pub struct Session<B: TermBackend> {
    backend: B,
    slots: SlotAllocator,
    snapshot: SessionSnapshot,
    finished: bool,
}

impl<B: TermBackend> Session<B> {
    /// Acquire the terminal
    ///
    /// Fails with `Error::TerminalInit` before any palette state has been
    /// touched.
    pub fn begin(mut backend: B) -> Result<Self> {
        backend
            .enter()
            .map_err(|e| Error::TerminalInit(e.to_string()))?;
        Ok(Self {
            backend,
            slots: SlotAllocator::new(),
            snapshot: SessionSnapshot::new(),
            finished: false,
        })
    }

    /// Current `(cols, rows)` geometry
    pub fn geometry(&self) -> Result<(u16, u16)> {
        Ok(self.backend.size()?)
    }

    /// Start a new frame: clear the screen and recycle the slot table
    pub fn begin_frame(&mut self) -> Result<()> {
        self.backend.clear()?;
        self.slots.reset();
        Ok(())
    }

    /// Resolve a terminal slot for a quantized color
    ///
    /// Cache hits are free; a fresh allocation records the slot's
    /// pre-overwrite contents and programs the terminal register.
    pub fn slot_for(&mut self, rgb: Rgb) -> Result<u8> {
        match self.slots.lookup(rgb) {
            SlotRequest::Hit(index) => Ok(index),
            SlotRequest::Allocated {
                index,
                original_rgb,
            } => {
                self.snapshot.record(index, original_rgb);
                self.backend.program_slot(index, rgb)?;
                Ok(index)
            }
        }
    }

    pub fn draw_header(&mut self, text: &str) -> Result<()> {
        Ok(self.backend.draw_header(text)?)
    }

    pub fn draw_row(&mut self, y: u16, slots: &[u8]) -> Result<()> {
        Ok(self.backend.draw_row(y, slots)?)
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.backend.flush()?)
    }

    pub fn poll_input(&mut self, timeout: Option<Duration>) -> Result<Option<InputEvent>> {
        Ok(self.backend.poll_input(timeout)?)
    }

    /// Number of dynamic slots allocated for the current frame
    pub fn allocated_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Release the terminal
    ///
    /// Restores every palette register the session programmed, re-enables
    /// default colors and cooked mode. Safe to call more than once.
    pub fn end(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let entries: Vec<(u8, Rgb)> = self.snapshot.entries().collect();
        for (index, original_rgb) in entries {
            self.backend.restore_slot(index, original_rgb)?;
        }
        self.snapshot.clear();
        self.slots.reset();

        self.backend.reset_colors()?;
        self.backend.flush()?;
        self.backend.leave()?;
        Ok(())
    }
}

impl<B: TermBackend> Drop for Session<B> {
    fn drop(&mut self) {
        let _ = self.end();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// Recording fake backend for viewer tests
    #[derive(Debug)]
    pub struct RecordingBackend {
        pub cols: u16,
        pub rows: u16,
        pub entered: u32,
        pub left: u32,
        pub cleared: u32,
        pub flushes: u32,
        pub programmed: Vec<(u8, Rgb)>,
        pub restored: Vec<(u8, Rgb)>,
        pub color_resets: u32,
        pub headers: Vec<String>,
        pub rows_drawn: Vec<(u16, Vec<u8>)>,
        pub inputs: VecDeque<Option<InputEvent>>,
        pub fail_enter: bool,
    }

    impl RecordingBackend {
        pub fn new(cols: u16, rows: u16) -> Self {
            Self {
                cols,
                rows,
                entered: 0,
                left: 0,
                cleared: 0,
                flushes: 0,
                programmed: Vec::new(),
                restored: Vec::new(),
                color_resets: 0,
                headers: Vec::new(),
                rows_drawn: Vec::new(),
                inputs: VecDeque::new(),
                fail_enter: false,
            }
        }

        pub fn with_inputs(mut self, inputs: Vec<Option<InputEvent>>) -> Self {
            self.inputs = inputs.into();
            self
        }
    }

    impl TermBackend for RecordingBackend {
        fn enter(&mut self) -> io::Result<()> {
            if self.fail_enter {
                return Err(io::Error::other("no tty"));
            }
            self.entered += 1;
            Ok(())
        }

        fn leave(&mut self) -> io::Result<()> {
            self.left += 1;
            Ok(())
        }

        fn size(&self) -> io::Result<(u16, u16)> {
            Ok((self.cols, self.rows))
        }

        fn clear(&mut self) -> io::Result<()> {
            self.cleared += 1;
            Ok(())
        }

        fn program_slot(&mut self, index: u8, rgb: Rgb) -> io::Result<()> {
            self.programmed.push((index, rgb));
            Ok(())
        }

        fn restore_slot(&mut self, index: u8, rgb: Rgb) -> io::Result<()> {
            self.restored.push((index, rgb));
            Ok(())
        }

        fn reset_colors(&mut self) -> io::Result<()> {
            self.color_resets += 1;
            Ok(())
        }

        fn draw_header(&mut self, text: &str) -> io::Result<()> {
            self.headers.push(text.to_string());
            Ok(())
        }

        fn draw_row(&mut self, y: u16, slots: &[u8]) -> io::Result<()> {
            self.rows_drawn.push((y, slots.to_vec()));
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }

        fn poll_input(&mut self, _timeout: Option<Duration>) -> io::Result<Option<InputEvent>> {
            // Scripted; once exhausted, quit so tests cannot hang
            Ok(self
                .inputs
                .pop_front()
                .unwrap_or(Some(InputEvent::Key(NavKey::Quit))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingBackend;
    use super::*;
    use crate::viewer::palette::{RESERVED_SLOTS, xterm_default};

    #[test]
    fn test_begin_failure_is_terminal_init() {
        let mut backend = RecordingBackend::new(80, 24);
        backend.fail_enter = true;
        match Session::begin(backend) {
            Err(Error::TerminalInit(_)) => {}
            other => panic!("expected TerminalInit, got {other:?}"),
        }
    }

    #[test]
    fn test_slot_for_programs_device_once_per_color() {
        let backend = RecordingBackend::new(80, 24);
        let mut session = Session::begin(backend).unwrap();

        let white = Rgb::new(255, 255, 255);
        let a = session.slot_for(white).unwrap();
        let b = session.slot_for(white).unwrap();
        assert_eq!(a, b);
        assert_eq!(session.backend().programmed, vec![(a, white)]);
    }

    #[test]
    fn test_end_restores_and_is_idempotent() {
        let backend = RecordingBackend::new(80, 24);
        let mut session = Session::begin(backend).unwrap();

        let first = RESERVED_SLOTS as u8;
        session.slot_for(Rgb::new(1, 2, 3)).unwrap();
        session.slot_for(Rgb::new(4, 5, 6)).unwrap();

        session.end().unwrap();
        session.end().unwrap();

        let backend = session.backend();
        assert_eq!(
            backend.restored,
            vec![
                (first, xterm_default(first)),
                (first + 1, xterm_default(first + 1)),
            ]
        );
        assert_eq!(backend.left, 1);
        assert_eq!(backend.color_resets, 1);
    }

    #[test]
    fn test_snapshot_spans_frames() {
        let backend = RecordingBackend::new(80, 24);
        let mut session = Session::begin(backend).unwrap();

        // Frame 1 allocates two slots, frame 2 reuses the first index for
        // a different color; the snapshot still holds one entry per index.
        session.slot_for(Rgb::new(1, 1, 1)).unwrap();
        session.slot_for(Rgb::new(2, 2, 2)).unwrap();
        session.begin_frame().unwrap();
        session.slot_for(Rgb::new(9, 9, 9)).unwrap();

        session.end().unwrap();
        assert_eq!(session.backend().restored.len(), 2);
    }

    #[test]
    fn test_drop_runs_teardown() {
        let backend = RecordingBackend::new(80, 24);
        let session = Session::begin(backend).unwrap();
        drop(session);
        // Cannot inspect the moved backend after drop; the observable
        // contract is that drop does not panic on an unfinished session.
    }

    #[test]
    fn test_fit_to_width() {
        assert_eq!(fit_to_width("abc", 5), "abc  ");
        assert_eq!(fit_to_width("abcdef", 4), "abcd");
    }

    #[test]
    fn test_map_key_bindings() {
        let press = |code| KeyEvent::new(code, KeyModifiers::empty());
        assert_eq!(map_key(press(KeyCode::Char('q'))), InputEvent::Key(NavKey::Quit));
        assert_eq!(map_key(press(KeyCode::Esc)), InputEvent::Key(NavKey::Quit));
        assert_eq!(map_key(press(KeyCode::Right)), InputEvent::Key(NavKey::Next));
        assert_eq!(map_key(press(KeyCode::Char(' '))), InputEvent::Key(NavKey::Next));
        assert_eq!(map_key(press(KeyCode::Left)), InputEvent::Key(NavKey::Previous));
        assert_eq!(map_key(press(KeyCode::Char('x'))), InputEvent::Other);
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            InputEvent::Key(NavKey::Quit)
        );
    }
}
