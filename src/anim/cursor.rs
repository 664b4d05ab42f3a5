use log::trace;

/// Inclusive range of frames that playback loops over
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopRange {
    pub start: usize,
    pub end: usize,
}

impl LoopRange {
    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start + 1
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        false
    }

    #[must_use]
    pub const fn contains(self, frame: usize) -> bool {
        frame >= self.start && frame <= self.end
    }
}

/// Maps an unbounded frame position into the loop range. Positions before
/// the range clamp to its start, positions past its end wrap back to it.
/// The fractional part is kept for interpolation.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn wrap_position(raw: f64, range: LoopRange) -> f64 {
    let start = range.start as f64;
    let end = range.end as f64;
    if raw < start || raw.is_nan() {
        start
    } else if raw < end + 1.0 {
        raw
    } else {
        start + (raw - start) % range.len() as f64
    }
}

/// Frame to show after `elapsed` seconds of playback at `fps`
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn select_frame(elapsed: f64, fps: f64, range: LoopRange) -> usize {
    wrap_position(elapsed * fps, range).floor() as usize
}

/// Playback state. Time only accumulates while playing and not seeking.
#[derive(Clone, Debug)]
pub struct AnimationCursor {
    total: usize,
    fps: f64,
    range: LoopRange,
    playing: bool,
    seeking: bool,
    /// Seconds of playback, mapped to a frame through `wrap_position`
    time: f64,
    position: f64,
}

impl AnimationCursor {
    /// `total` must be at least one frame
    #[must_use]
    pub fn new(total: usize, fps: f64) -> Self {
        let last = total.saturating_sub(1);
        Self {
            total: total.max(1),
            fps: if fps > 0.0 { fps } else { 30.0 },
            range: LoopRange {
                start: 0,
                end: last,
            },
            playing: true,
            seeking: false,
            time: 0.0,
            position: 0.0,
        }
    }

    /// Continuous frame position
    #[must_use]
    pub const fn position(&self) -> f64 {
        self.position
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn frame_index(&self) -> usize {
        (self.position.floor() as usize).min(self.total - 1)
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub const fn fps(&self) -> f64 {
        self.fps
    }

    #[must_use]
    pub const fn loop_range(&self) -> LoopRange {
        self.range
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.playing
    }

    #[must_use]
    pub const fn is_seeking(&self) -> bool {
        self.seeking
    }

    /// Advances playback by `delta` seconds
    pub fn advance(&mut self, delta: f64) {
        if self.playing && !self.seeking {
            self.time += delta.max(0.0);
            self.position = wrap_position(self.time * self.fps, self.range);
        }
    }

    pub fn toggle_play(&mut self) {
        self.playing = !self.playing;
        trace!("playing={}", self.playing);
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Starts a seek drag. Time accumulation is suspended until `end_seek`.
    pub fn begin_seek(&mut self) {
        self.seeking = true;
    }

    /// Moves directly to a frame position from user input
    #[allow(clippy::cast_precision_loss)]
    pub fn seek(&mut self, position: f64) {
        let last = (self.total - 1) as f64;
        self.position = position.clamp(0.0, last);
        self.time = self.position / self.fps;
    }

    /// Moves by whole frames, wrapping inside the loop range
    #[allow(clippy::cast_precision_loss)]
    pub fn step(&mut self, frames: i64) {
        let len = self.range.len() as i64;
        let start = self.range.start as i64;
        #[allow(clippy::cast_possible_wrap)]
        let current = self.frame_index() as i64;
        let next = start + (current - start + frames).rem_euclid(len);
        self.seek(next as f64);
    }

    pub fn end_seek(&mut self) {
        self.seeking = false;
    }

    /// Sets the loop start, pulling the end along if needed
    pub fn set_loop_start(&mut self, frame: usize) {
        let frame = frame.min(self.total - 1);
        self.range.start = frame;
        self.range.end = self.range.end.max(frame);
    }

    /// Sets the loop end, pulling the start along if needed
    pub fn set_loop_end(&mut self, frame: usize) {
        let frame = frame.min(self.total - 1);
        self.range.end = frame;
        self.range.start = self.range.start.min(frame);
    }

    /// Loops over the whole recording again
    pub fn reset_loop(&mut self) {
        self.range = LoopRange {
            start: 0,
            end: self.total - 1,
        };
    }

    /// Jumps to the start of the loop range
    pub fn rewind(&mut self) {
        self.seek(self.range.start as f64);
    }
}
