use crate::{
    anim::{AnimationCursor, Interpolation},
    input::InputState,
    keyboard::Keyboard,
};
use log::{debug, info};
use winit::event::VirtualKeyCode;

/// Seconds a step key is held before it starts repeating
const REPEAT_DELAY: f64 = 0.3;

/// Groups that can be hidden
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayFlags {
    pub floor: bool,
    pub axes: bool,
}

/// What the application should do after the controls were applied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Continue,
    Quit,
}

/// Keyboard and mouse playback controls
///
/// | Input | Action |
/// |---|---|
/// | `Space` | play / pause |
/// | `Left` `Right` | step one frame, repeating while held |
/// | `Home` | jump to the loop start |
/// | `[` `]` | set loop start or end to the current frame |
/// | `Backspace` | loop over the whole recording |
/// | `F` `G` | toggle floor or axes |
/// | `I` | switch between step and linear interpolation |
/// | `Escape` | quit |
/// | right drag | scrub across the window width |
#[derive(Clone, Debug)]
pub struct PlaybackControls {
    flags: DisplayFlags,
    interpolation: Interpolation,
    scrubbing: bool,
    stepping: bool,
    /// Seconds until a held step key repeats
    repeat_in: f64,
}

impl PlaybackControls {
    #[must_use]
    pub const fn new(
        flags: DisplayFlags,
        interpolation: Interpolation,
    ) -> Self {
        Self {
            flags,
            interpolation,
            scrubbing: false,
            stepping: false,
            repeat_in: 0.0,
        }
    }

    #[must_use]
    pub const fn flags(&self) -> DisplayFlags {
        self.flags
    }

    #[must_use]
    pub const fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    #[must_use]
    pub const fn is_scrubbing(&self) -> bool {
        self.scrubbing
    }

    /// Applies one frame of input to the cursor. `delta` is the frame time
    /// in seconds and `width` the window width in pixels.
    pub fn update(
        &mut self,
        keyboard: &Keyboard,
        input: &InputState,
        width: u32,
        delta: f64,
        cursor: &mut AnimationCursor,
    ) -> Command {
        if keyboard.is_just_pressed(VirtualKeyCode::Escape) {
            info!("Escape pressed");
            return Command::Quit;
        }
        if keyboard.is_just_pressed(VirtualKeyCode::Space) {
            cursor.toggle_play();
        }
        if keyboard.is_just_pressed(VirtualKeyCode::Home) {
            cursor.rewind();
        }
        if keyboard.is_just_pressed(VirtualKeyCode::LBracket) {
            cursor.set_loop_start(cursor.frame_index());
            debug!("loop {:?}", cursor.loop_range());
        }
        if keyboard.is_just_pressed(VirtualKeyCode::RBracket) {
            cursor.set_loop_end(cursor.frame_index());
            debug!("loop {:?}", cursor.loop_range());
        }
        if keyboard.is_just_pressed(VirtualKeyCode::Back) {
            cursor.reset_loop();
            debug!("loop {:?}", cursor.loop_range());
        }
        if keyboard.is_just_pressed(VirtualKeyCode::F) {
            self.flags.floor = !self.flags.floor;
        }
        if keyboard.is_just_pressed(VirtualKeyCode::G) {
            self.flags.axes = !self.flags.axes;
        }
        if keyboard.is_just_pressed(VirtualKeyCode::I) {
            self.interpolation = match self.interpolation {
                Interpolation::Step => Interpolation::Linear,
                Interpolation::Linear => Interpolation::Step,
            };
            debug!("interpolation {:?}", self.interpolation);
        }

        self.step(keyboard, delta, cursor);
        self.scrub(input, width, cursor);
        Command::Continue
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn step(
        &mut self,
        keyboard: &Keyboard,
        delta: f64,
        cursor: &mut AnimationCursor,
    ) {
        let left = keyboard.is_pressed(VirtualKeyCode::Left);
        let right = keyboard.is_pressed(VirtualKeyCode::Right);
        let direction = match (left, right) {
            (true, false) => -1,
            (false, true) => 1,
            _ => 0,
        };
        if direction == 0 {
            if self.stepping {
                self.stepping = false;
                if !self.scrubbing {
                    cursor.end_seek();
                }
            }
            return;
        }

        let period = 1.0 / cursor.fps();
        if self.stepping {
            self.repeat_in -= delta;
            if self.repeat_in <= 0.0 {
                // Whole periods elapsed, reduced to one trip round the loop
                let steps = (-self.repeat_in / period).floor() + 1.0;
                self.repeat_in += steps * period;
                let len = cursor.loop_range().len() as f64;
                cursor.step(direction * (steps % len) as i64);
            }
        } else {
            // First press steps at once, holding repeats at the frame rate
            self.stepping = true;
            cursor.begin_seek();
            cursor.step(direction);
            self.repeat_in = period.max(REPEAT_DELAY);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn scrub(
        &mut self,
        input: &InputState,
        width: u32,
        cursor: &mut AnimationCursor,
    ) {
        let dragging = input.right() && !input.ui_focused() && width > 0;
        match (dragging, input.position()) {
            (true, Some([x, _])) => {
                if !self.scrubbing {
                    self.scrubbing = true;
                    cursor.begin_seek();
                }
                let fraction = (x / f64::from(width)).clamp(0.0, 1.0);
                cursor.seek(fraction * (cursor.total() - 1) as f64);
            }
            (true, None) => {}
            (false, _) => {
                if self.scrubbing {
                    self.scrubbing = false;
                    if !self.stepping {
                        cursor.end_seek();
                    }
                }
            }
        }
    }
}
