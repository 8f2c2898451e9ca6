// src/io/mod.rs
//
// Presentation / input boundary.
//
// The experiment core never touches a window or a keyboard. It emits draw
// calls, flips frames and blocks on key waits through these traits; the
// front end behind them can be swapped:
// - sim::SimRig:           virtual clock + scripted participant (tests, batch runs)
// - terminal::TerminalRig: crossterm text front end for real sessions

pub mod sim;
pub mod terminal;

use std::io;
use std::time::Duration;

use crate::comprehension::Respondent;
use crate::stimulus::{ColorId, ShapeGeometry, ShapeKind};
use crate::types::{Flow, Key};

/// Text color hint for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Positive,
    Negative,
}

/// One draw call. Positions are in normalized window units ([-1, 1]).
#[derive(Debug, Clone, PartialEq)]
pub enum VisualElement {
    FixationCross,
    Stimulus {
        shape: ShapeKind,
        color: ColorId,
        geometry: ShapeGeometry,
        /// Outline overlay acknowledging an action press.
        acknowledged: bool,
    },
    Text {
        text: String,
        pos: (f64, f64),
        height: f64,
        tone: Tone,
    },
    /// Clickable answer option of the comprehension check.
    Button {
        index: usize,
        label: String,
        pos: (f64, f64),
    },
}

impl VisualElement {
    pub fn text(text: impl Into<String>) -> Self {
        VisualElement::Text {
            text: text.into(),
            pos: (0.0, 0.0),
            height: 0.075,
            tone: Tone::Plain,
        }
    }
}

/// Rendering collaborator.
pub trait Presenter {
    /// Queue an element for the next frame.
    fn draw(&mut self, element: &VisualElement);

    /// Flip: show everything drawn since the last flip, then start an
    /// empty frame.
    fn present(&mut self) -> io::Result<()>;
}

/// Input + timing collaborator.
pub trait InputDevice {
    /// Block until one of `allowed` is pressed or `timeout` elapses
    /// (`None` = no timeout). Returns `None` only after the full timeout.
    fn wait_for_key(&mut self, allowed: &[Key], timeout: Option<Duration>)
        -> io::Result<Option<Key>>;

    /// Monotonic time since the device was created.
    fn now(&self) -> Duration;

    fn elapsed_since(&self, mark: Duration) -> Duration {
        self.now().saturating_sub(mark)
    }
}

/// Everything a session needs from its front end.
pub trait Devices: Presenter + InputDevice + Respondent {}

impl<T: Presenter + InputDevice + Respondent + ?Sized> Devices for T {}

/// Timed wait that still honours the abort key.
pub fn hold<D: InputDevice + ?Sized>(dev: &mut D, duration: Duration) -> io::Result<Flow<()>> {
    if duration.is_zero() {
        return Ok(Flow::Continue(()));
    }
    match dev.wait_for_key(&[Key::Abort], Some(duration))? {
        Some(Key::Abort) => Ok(Flow::Abort),
        _ => Ok(Flow::Continue(())),
    }
}

/// Show a full-screen message and wait for the action key.
pub fn screen<D: Presenter + InputDevice + ?Sized>(dev: &mut D, text: &str) -> io::Result<Flow<()>> {
    dev.draw(&VisualElement::text(text));
    dev.present()?;
    match dev.wait_for_key(&[Key::Action, Key::Abort], None)? {
        Some(Key::Abort) => Ok(Flow::Abort),
        _ => Ok(Flow::Continue(())),
    }
}
