//! Frame-invalidation state machine.
//!
//! The host UI framework delivers a tick every frame regardless of whether
//! anything changed. [`FrameScheduler`] turns style/geometry mutations into
//! "a frame is needed" state and guards against re-entrant ticks starting a
//! second draw while one is still in flight.

/// Where the control is in its render cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FramePhase {
    /// No pending render.
    #[default]
    Idle,
    /// Content changed; a frame is scheduled for the next tick.
    RenderRequested,
    /// A draw is in flight. Ticks arriving now are dropped.
    Rendering,
}

/// Tracks whether the next tick must render, and whether the host must run a
/// layout pass first.
///
/// The control starts with a render pending so the first tick after attach
/// paints the initial content.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    phase: FramePhase,
    measure_requested: bool,
    /// A render was requested while a draw was in flight; re-arm on finish.
    pending_during_render: bool,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            phase: FramePhase::RenderRequested,
            measure_requested: false,
            pending_during_render: false,
        }
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// A visual input changed; schedule a frame.
    ///
    /// Requests arriving while a draw is in flight are preserved: the phase
    /// returns to `RenderRequested` (not `Idle`) when that draw completes.
    pub fn request_render(&mut self) {
        match self.phase {
            FramePhase::Idle | FramePhase::RenderRequested => {
                self.phase = FramePhase::RenderRequested;
            }
            FramePhase::Rendering => self.pending_during_render = true,
        }
    }

    /// A size-affecting input changed; schedule a frame and a layout pass.
    pub fn request_render_and_measure(&mut self) {
        self.request_render();
        self.measure_requested = true;
    }

    /// Whether the host must re-run layout before the next draw. Clears the
    /// flag.
    pub fn take_measure_request(&mut self) -> bool {
        std::mem::take(&mut self.measure_requested)
    }

    /// Called on every tick. Returns `true` when the caller should run a
    /// draw now, entering the `Rendering` phase. Returns `false` when
    /// nothing is pending or a draw is already in flight (the re-entrancy
    /// guard).
    pub fn begin_frame(&mut self) -> bool {
        match self.phase {
            FramePhase::RenderRequested => {
                self.phase = FramePhase::Rendering;
                true
            }
            FramePhase::Idle | FramePhase::Rendering => false,
        }
    }

    /// Called when the draw begun by [`begin_frame`](Self::begin_frame)
    /// finished (successfully or not).
    pub fn finish_frame(&mut self) {
        debug_assert_eq!(self.phase, FramePhase::Rendering);
        self.phase = if std::mem::take(&mut self.pending_during_render) {
            FramePhase::RenderRequested
        } else {
            FramePhase::Idle
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_render_pending() {
        let mut s = FrameScheduler::new();
        assert_eq!(s.phase(), FramePhase::RenderRequested);
        assert!(s.begin_frame());
        s.finish_frame();
        assert_eq!(s.phase(), FramePhase::Idle);
    }

    #[test]
    fn test_idle_tick_does_nothing() {
        let mut s = FrameScheduler::new();
        assert!(s.begin_frame());
        s.finish_frame();
        assert!(!s.begin_frame());
        assert_eq!(s.phase(), FramePhase::Idle);
    }

    #[test]
    fn test_reentrant_tick_dropped() {
        let mut s = FrameScheduler::new();
        let mut in_flight = 0u32;
        let mut max_in_flight = 0u32;

        // First tick enters Rendering; a tick arriving before finish_frame
        // (the re-entrant callback case) must not start a second draw.
        if s.begin_frame() {
            in_flight += 1;
            max_in_flight = max_in_flight.max(in_flight);

            if s.begin_frame() {
                in_flight += 1;
                max_in_flight = max_in_flight.max(in_flight);
            }

            in_flight -= 1;
            s.finish_frame();
        }

        assert_eq!(max_in_flight, 1);
        assert_eq!(in_flight, 0);
    }

    #[test]
    fn test_request_during_render_survives() {
        let mut s = FrameScheduler::new();
        assert!(s.begin_frame());
        s.request_render();
        s.finish_frame();
        assert_eq!(s.phase(), FramePhase::RenderRequested);
        assert!(s.begin_frame());
    }

    #[test]
    fn test_measure_request_taken_once() {
        let mut s = FrameScheduler::new();
        s.request_render_and_measure();
        assert!(s.take_measure_request());
        assert!(!s.take_measure_request());
    }

    #[test]
    fn test_request_render_idempotent() {
        let mut s = FrameScheduler::new();
        assert!(s.begin_frame());
        s.finish_frame();

        s.request_render();
        s.request_render();
        assert!(s.begin_frame());
        s.finish_frame();
        assert_eq!(s.phase(), FramePhase::Idle);
    }
}
