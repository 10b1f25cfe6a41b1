//! Slideshow navigation state machine
//!
//! Drives the viewing loop: display the image under the cursor, wait for
//! input (bounded wait in slideshow mode), advance with clamping at both
//! ends, and exit on quit or when a slideshow runs past its last image.

use super::render;
use super::term::{InputEvent, Session, TermBackend};
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Recognized navigation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Next,
    Previous,
    Quit,
}

/// Navigation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavMode {
    /// Block indefinitely for a key
    Interactive,
    /// Auto-advance after a timeout absent user input
    Slideshow,
}

/// Why the viewing loop ended; reported back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKey {
    /// The user pressed quit
    Quit,
    /// A slideshow advanced past its last image
    Finished,
}

/// Result of one state-machine step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// Display the image under the (possibly unchanged) cursor
    Advance,
    /// Keep waiting for input
    Idle,
    /// Tear down and return
    Exit(ExitKey),
}

/// Cursor state over an ordered image sequence
///
/// The cursor is clamped to `[0, len - 1]`; navigation never wraps and
/// never indexes out of bounds.
#[derive(Debug)]
pub struct Navigator {
    len: usize,
    cursor: usize,
    mode: NavMode,
    timeout: Duration,
}

impl Navigator {
    pub fn new(len: usize, mode: NavMode, timeout: Duration) -> Self {
        debug_assert!(len > 0);
        Self {
            len,
            cursor: 0,
            mode,
            timeout,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bounded wait for slideshow mode, unbounded otherwise
    pub fn wait_timeout(&self) -> Option<Duration> {
        match self.mode {
            NavMode::Interactive => None,
            NavMode::Slideshow => Some(self.timeout),
        }
    }

    /// Advance the state machine by one input
    ///
    /// `None` means the bounded wait elapsed without a key: a slideshow
    /// behaves as if next were pressed, except past the last image, where
    /// the sequence is exhausted and the loop exits.
    pub fn step(&mut self, input: Option<NavKey>) -> NavOutcome {
        match input {
            Some(NavKey::Quit) => NavOutcome::Exit(ExitKey::Quit),
            Some(NavKey::Next) => {
                // Clamped: next on the last image re-displays it
                self.cursor = (self.cursor + 1).min(self.len - 1);
                NavOutcome::Advance
            }
            Some(NavKey::Previous) => {
                self.cursor = self.cursor.saturating_sub(1);
                NavOutcome::Advance
            }
            None => match self.mode {
                NavMode::Slideshow => {
                    if self.cursor + 1 >= self.len {
                        NavOutcome::Exit(ExitKey::Finished)
                    } else {
                        self.cursor += 1;
                        NavOutcome::Advance
                    }
                }
                NavMode::Interactive => NavOutcome::Idle,
            },
        }
    }
}

/// Run the viewing loop over a sequence of images
///
/// Renders the image under the cursor, waits for input and steps the
/// navigator until it exits. Teardown is the caller's responsibility so it
/// can run on error paths as well.
pub fn run<B: TermBackend>(
    session: &mut Session<B>,
    images: &[PathBuf],
    nav: &mut Navigator,
) -> Result<ExitKey> {
    loop {
        // Displaying(cursor)
        let path = &images[nav.cursor()];
        let header = header_line(path, nav);
        match super::decode(path) {
            Ok(img) => render::render(session, &img, &header)?,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to decode image");
                render::render_message(session, &format!("{header}  (cannot decode)"))?;
            }
        }

        // AwaitingInput: one bounded wait per displayed image;
        // unrecognized keys are re-read against the same deadline
        let deadline = nav.wait_timeout().map(|t| Instant::now() + t);
        let waited = loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            match session.poll_input(remaining)? {
                Some(InputEvent::Key(key)) => break Waited::Key(key),
                Some(InputEvent::Resize) => break Waited::Resized,
                Some(InputEvent::Other) => {}
                None => break Waited::TimedOut,
            }
        };

        // Advancing / Exiting
        let outcome = match waited {
            Waited::Resized => {
                debug!("Terminal resized, repainting");
                NavOutcome::Advance
            }
            Waited::Key(key) => nav.step(Some(key)),
            Waited::TimedOut => nav.step(None),
        };
        match outcome {
            NavOutcome::Advance | NavOutcome::Idle => {}
            NavOutcome::Exit(key) => return Ok(key),
        }
    }
}

/// Outcome of one bounded wait for input
enum Waited {
    Key(NavKey),
    TimedOut,
    Resized,
}

/// Status line: image name, position and key hints
fn header_line(path: &Path, nav: &Navigator) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    format!(
        " {} [{}/{}]  n:next p:prev q:quit",
        name,
        nav.cursor() + 1,
        nav.len
    )
}
