use crate::anim::AnimationCursor;
use std::time::Duration;

/// How often the window title is rewritten
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(500);

/// Playback state and frame rate shown in the window title
#[derive(Clone, Debug)]
pub struct TitleIndicator {
    base: String,
    joints: usize,
    frames: usize,
    since_refresh: Duration,
    fps: f64,
}

impl TitleIndicator {
    #[must_use]
    pub fn new(base: &str, joints: usize) -> Self {
        Self {
            base: base.to_owned(),
            joints,
            frames: 0,
            since_refresh: Duration::ZERO,
            fps: 0.0,
        }
    }

    /// Counts a presented frame
    pub fn frame_presented(&mut self) {
        self.frames += 1;
    }

    /// Returns a new title once per `REFRESH_INTERVAL`
    #[allow(clippy::cast_precision_loss)]
    pub fn update(
        &mut self,
        delta: Duration,
        cursor: &AnimationCursor,
    ) -> Option<String> {
        self.since_refresh += delta;
        if self.since_refresh < REFRESH_INTERVAL {
            return None;
        }
        self.fps = self.frames as f64 / self.since_refresh.as_secs_f64();
        self.frames = 0;
        self.since_refresh = Duration::ZERO;
        Some(format_title(&self.base, cursor, self.joints, self.fps))
    }

    #[must_use]
    pub const fn fps(&self) -> f64 {
        self.fps
    }
}

/// `base | frame n / total (p%) | j joints | f fps`, frames counted from 1
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_title(
    base: &str,
    cursor: &AnimationCursor,
    joints: usize,
    fps: f64,
) -> String {
    let frame = cursor.frame_index() + 1;
    let total = cursor.total();
    let percent = frame as f64 * 100.0 / total as f64;
    let state = if cursor.is_playing() { "" } else { " paused" };
    format!(
        "{base} | frame {frame} / {total} ({percent:.0}%){state} | \
         {joints} joints | {fps:.0} fps"
    )
}
