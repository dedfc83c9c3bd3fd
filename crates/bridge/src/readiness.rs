/// Fires the external "ready" signal exactly once per session.
///
/// Without a globe the viewer publication is the ready point; with a globe
/// it is the first tick that actually applied a camera update.
#[derive(Debug, Clone)]
pub struct ReadinessNotifier {
    globe_enabled: bool,
    fired: bool,
}

impl ReadinessNotifier {
    pub fn new(globe_enabled: bool) -> Self {
        Self {
            globe_enabled,
            fired: false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Returns true when this call is the one that fires.
    pub fn viewer_published(&mut self) -> bool {
        !self.globe_enabled && self.fire()
    }

    pub fn sync_applied(&mut self) -> bool {
        self.globe_enabled && self.fire()
    }

    fn fire(&mut self) -> bool {
        !std::mem::replace(&mut self.fired, true)
    }

    /// Re-arms after unmount.
    pub fn reset(&mut self) {
        self.fired = false;
    }
}
