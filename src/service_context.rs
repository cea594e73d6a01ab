// Process-level server context.
//
// Per §9's "global mutable state" design note: the vsync timer, the
// message-queue/monitor registry, and the scene-graph "active display"
// are process-wide singletons in the source. This struct makes that
// explicit instead of reaching for `lazy_static` globals the way the
// rest of the ambient stack does for purely read-only config — state
// that changes at runtime is owned here and threaded through.
use wm_utils::log::debug;

use crate::vsync::REFRESH_PERIOD_MS;
use crate::window::renderer::Renderer;
use crate::window::WindowService;

pub struct ServiceContext {
    pub service: WindowService,
    pub renderer: Box<dyn Renderer>,
    vsync_timer_running: bool,
    last_vsync_ms: Option<u64>,
}

impl ServiceContext {
    pub fn new(display_width: i32, display_height: i32, renderer: Box<dyn Renderer>) -> Self {
        Self {
            service: WindowService::new(display_width, display_height),
            renderer,
            vsync_timer_running: false,
            last_vsync_ms: None,
        }
    }

    pub fn is_vsync_timer_running(&self) -> bool {
        self.vsync_timer_running
    }

    /// Enables the timer if any window is subscribed; called after
    /// `requestVsync` and after `applyTransaction`.
    pub fn sync_vsync_timer(&mut self) {
        let should_run = self.service.any_subscribed();
        if should_run && !self.vsync_timer_running {
            debug!("vsync timer: starting (period {}ms)", REFRESH_PERIOD_MS);
        } else if !should_run && self.vsync_timer_running {
            debug!("vsync timer: stopping, no subscribers");
        }
        self.vsync_timer_running = should_run;
    }

    /// Fires one vsync tick: advances every subscribed window and
    /// returns the client handles that should receive `onFrame`.
    ///
    /// Resetting the timer from completion rather than strict wallclock
    /// (the spec's anti-pile-up rule) is the caller's responsibility:
    /// the reactor should re-arm `REFRESH_PERIOD_MS` after this returns,
    /// not on a fixed wallclock schedule.
    pub fn on_vsync(&mut self) -> Vec<u64> {
        let fired = self.service.on_vsync();
        self.last_vsync_ms = Some(wm_utils::log::get_current_millis());
        self.sync_vsync_timer();
        fired
    }
}
