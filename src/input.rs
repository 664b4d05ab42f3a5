use log::trace;
use winit::event::{
    ElementState, ModifiersState, MouseButton, MouseScrollDelta, WindowEvent,
};

/// Scroll lines reported for this many pixels of touchpad scrolling
const PIXELS_PER_LINE: f64 = 20.0;

/// Mouse and modifier state gathered from window events during one frame.
/// Deltas and scroll accumulate until `end_frame`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputState {
    position: Option<[f64; 2]>,
    delta: [f64; 2],
    scroll: [f64; 2],
    left: bool,
    middle: bool,
    right: bool,
    modifiers: ModifiersState,
    ui_focused: bool,
}

impl InputState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the state from a window event
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved([position.x, position.y]);
            }
            WindowEvent::CursorLeft { .. } => self.position = None,
            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse_input(*button, *state);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let (x, y) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => {
                        (f64::from(*x), f64::from(*y))
                    }
                    MouseScrollDelta::PixelDelta(p) => {
                        (p.x / PIXELS_PER_LINE, p.y / PIXELS_PER_LINE)
                    }
                };
                self.scroll(x, y);
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = *modifiers;
            }
            WindowEvent::Focused(focused) => {
                // Releases are not reported while unfocused
                if !focused {
                    self.left = false;
                    self.middle = false;
                    self.right = false;
                }
                self.ui_focused = !focused;
            }
            _ => {}
        }
    }

    /// Records a cursor position. The first position after the cursor
    /// enters the window produces no delta.
    pub fn cursor_moved(&mut self, position: [f64; 2]) {
        if let Some(previous) = self.position {
            self.delta[0] += position[0] - previous[0];
            self.delta[1] += position[1] - previous[1];
        }
        self.position = Some(position);
    }

    pub fn mouse_input(&mut self, button: MouseButton, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => self.left = pressed,
            MouseButton::Middle => self.middle = pressed,
            MouseButton::Right => self.right = pressed,
            MouseButton::Other(_) => {}
        }
        trace!("mouse {:?} {:?}", button, state);
    }

    pub fn scroll(&mut self, x: f64, y: f64) {
        self.scroll[0] += x;
        self.scroll[1] += y;
    }

    pub fn set_modifiers(&mut self, modifiers: ModifiersState) {
        self.modifiers = modifiers;
    }

    /// While set, camera and timeline ignore the mouse
    pub fn set_ui_focused(&mut self, ui_focused: bool) {
        self.ui_focused = ui_focused;
    }

    /// Resets per frame accumulators. Call after everything has consumed
    /// the frame's input.
    pub fn end_frame(&mut self) {
        self.delta = [0.0, 0.0];
        self.scroll = [0.0, 0.0];
    }

    #[must_use]
    pub const fn position(&self) -> Option<[f64; 2]> {
        self.position
    }

    #[must_use]
    pub const fn delta(&self) -> [f64; 2] {
        self.delta
    }

    #[must_use]
    pub const fn scroll_delta(&self) -> [f64; 2] {
        self.scroll
    }

    #[must_use]
    pub const fn left(&self) -> bool {
        self.left
    }

    #[must_use]
    pub const fn middle(&self) -> bool {
        self.middle
    }

    #[must_use]
    pub const fn right(&self) -> bool {
        self.right
    }

    #[must_use]
    pub fn shift(&self) -> bool {
        self.modifiers.shift()
    }

    #[must_use]
    pub fn ctrl(&self) -> bool {
        self.modifiers.ctrl()
    }

    #[must_use]
    pub const fn ui_focused(&self) -> bool {
        self.ui_focused
    }
}
