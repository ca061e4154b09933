//! Extra miscellaneous structures.

pub mod ascii;
#[cfg(feature = "global-state")]
pub mod global_state;

use super::*;

/// Per-frame terminal input, as used by the demo to steer the view.
///
/// Fill it yourself, or with the `crossterm` dependency enabled, feed raw events through
/// [`TermInput::event`].
#[derive(Debug, Clone)]
pub struct TermInput {
    pub focused: bool,
    pub should_stop: bool,
    /// Accumulated drag since the last [`TermInput::new_frame`], in cells.
    pub drag: Vector2,
    pub scroll: f32,
    /// Toggles requested by the keyboard this frame.
    pub toggle_lighting: bool,
    pub cycle_polygon_mode: bool,
    last_pos: Option<Vector2>,
}

impl Default for TermInput {
    fn default() -> Self {
        Self {
            focused: true,
            should_stop: false,
            drag: Vector2::zeros(),
            scroll: 0.0,
            toggle_lighting: false,
            cycle_polygon_mode: false,
            last_pos: None,
        }
    }
}

impl TermInput {
    pub fn new_frame(&mut self) {
        self.drag = Vector2::zeros();
        self.scroll = 0.0;
        self.toggle_lighting = false;
        self.cycle_polygon_mode = false;
    }

    fn pointer(&mut self, pos: Vector2, down: bool) {
        if down {
            if let Some(last) = self.last_pos {
                self.drag += pos - last;
            }
            self.last_pos = Some(pos);
        } else {
            self.last_pos = None;
        }
    }
}

#[cfg(feature = "crossterm")]
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

#[cfg(feature = "crossterm")]
impl TermInput {
    /// Processes a crossterm event.
    pub fn event(&mut self, e: Event) {
        match e {
            Event::FocusGained => self.focused = true,
            Event::FocusLost => self.focused = false,
            Event::Key(KeyEvent {
                code, modifiers, ..
            }) => match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    self.should_stop = true
                }
                KeyCode::Char('q') | KeyCode::Esc => self.should_stop = true,
                KeyCode::Char('l') => self.toggle_lighting = true,
                KeyCode::Char('m') => self.cycle_polygon_mode = true,
                _ => (),
            },
            Event::Mouse(MouseEvent {
                kind, column, row, ..
            }) => {
                let pos = Vector2::new(column as f32, row as f32);
                match kind {
                    MouseEventKind::Down(_) | MouseEventKind::Drag(_) => self.pointer(pos, true),
                    MouseEventKind::Up(_) => self.pointer(pos, false),
                    MouseEventKind::ScrollUp => self.scroll += 1.0,
                    MouseEventKind::ScrollDown => self.scroll -= 1.0,
                    _ => (),
                }
            }
            _ => (),
        }
    }
}
