use crate::types::KeyboardHandler;
use ahash::AHashSet;
use winit::event::{ElementState, VirtualKeyCode};

/// Tracks which keys are held now and which were held at the end of the
/// previous frame, so a press can be told apart from a hold.
///
/// `VirtualKeyCode` is the symbolic key so bindings follow the keyboard
/// layout.
#[derive(Clone, Debug, Default)]
pub struct Keyboard {
    current: AHashSet<VirtualKeyCode>,
    previous: AHashSet<VirtualKeyCode>,
}

impl KeyboardHandler for Keyboard {
    fn input(&mut self, keycode: VirtualKeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.current.insert(keycode);
            }
            ElementState::Released => {
                self.current.remove(&keycode);
            }
        }
    }
}

impl Keyboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the end of every frame
    pub fn tick(&mut self) {
        self.previous.clone_from(&self.current);
    }

    /// Forgets held keys, for example when the window loses focus and
    /// releases will not be reported
    pub fn clear(&mut self) {
        self.current.clear();
    }

    #[must_use]
    pub fn is_pressed(&self, keycode: VirtualKeyCode) -> bool {
        self.current.contains(&keycode)
    }

    /// Pressed now but not last frame
    #[must_use]
    pub fn is_just_pressed(&self, keycode: VirtualKeyCode) -> bool {
        self.current.contains(&keycode) && !self.previous.contains(&keycode)
    }

    /// Released since last frame
    #[must_use]
    pub fn is_just_released(&self, keycode: VirtualKeyCode) -> bool {
        !self.current.contains(&keycode) && self.previous.contains(&keycode)
    }
}
