use foundation::time::Time;

/// Metadata for one host animation frame.
///
/// Hosts report a monotonic timestamp per frame; `FrameClock` turns those
/// into indexed frames with a clamped delta.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds since the previous frame (0 for the first).
    pub dt_s: f64,
    /// Host time at the start of the frame.
    pub time: Time,
}

impl Frame {
    pub fn first(time: Time) -> Self {
        Self {
            index: 0,
            dt_s: 0.0,
            time,
        }
    }

    pub fn next(self, time: Time) -> Self {
        Self {
            index: self.index + 1,
            dt_s: time.since(self.time),
            time,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    last: Option<Frame>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to a frame stamped with the host timestamp in milliseconds.
    pub fn advance(&mut self, timestamp_ms: f64) -> Frame {
        let time = Time::from_millis(timestamp_ms);
        let frame = match self.last {
            Some(prev) => prev.next(time),
            None => Frame::first(time),
        };
        self.last = Some(frame);
        frame
    }

    pub fn last(&self) -> Option<Frame> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
