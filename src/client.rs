// Client-side window: the BaseWindow equivalent.
//
// Grounded on app/BaseWindow.cpp. The UI toolkit (`mUIProxy` there) and
// the RPC stub (`mWindowManager`/`IWindow`) are both external
// collaborators per §1; this struct owns only what the source keeps on
// the object itself — vsync/app-visibility state, the buffer producer,
// and the reentrancy guard — and exposes the points where a real
// transport would plug in (`apply_transaction`'s return value,
// `set_surface_control`, `on_frame`).
use std::sync::atomic::{AtomicBool, Ordering};

use wm_utils::log::debug;

use crate::buffer_queue::{BufferKey, BufferProducer};
use crate::layout::{LayoutParams, Rect};
use crate::transaction::{LayerState, SurfaceTransaction};
use crate::vsync::VsyncRequest;
use crate::window::SurfaceControl;

/// The draw client capability named in §1: given a locked pixel buffer
/// and its size, fills it. `finish_drawing` reports whether the draw
/// completed (a false result cancels the buffer instead of queuing it).
pub trait DrawClient {
    fn draw_frame(&mut self, buffer: &mut [u8], width: u32, height: u32);
    fn finish_drawing(&mut self) -> bool;
    fn rect_crop(&self) -> Option<Rect>;
    fn update_visibility(&mut self, _visible: bool) {}
    fn update_resolution(&mut self, _width: u32, _height: u32) {}
}

pub struct BaseWindow<D: DrawClient> {
    pub layout_params: LayoutParams,
    vsync_request: VsyncRequest,
    app_visible: bool,
    /// The sole cross-handler synchronization point (§5, §9): guards
    /// against a reentrant `onFrame` arriving before the in-flight draw
    /// finishes. Acquire/release ordering, exchanged around the draw.
    frame_done: AtomicBool,
    surface_control: Option<SurfaceControl>,
    transaction: SurfaceTransaction,
    draw_client: D,
}

impl<D: DrawClient> BaseWindow<D> {
    pub fn new(layout_params: LayoutParams, draw_client: D) -> Self {
        Self {
            layout_params,
            vsync_request: VsyncRequest::None,
            app_visible: false,
            frame_done: AtomicBool::new(true),
            surface_control: None,
            transaction: SurfaceTransaction::new(),
            draw_client,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.app_visible
    }

    pub fn vsync_request(&self) -> VsyncRequest {
        self.vsync_request
    }

    fn producer(&self) -> Option<&BufferProducer> {
        self.surface_control.as_ref().map(|sc| &sc.producer)
    }

    /// Returns `true` if this call should send `requestVsync` to the
    /// server; a no-op (returns `false`) if invisible or already at
    /// this mode.
    pub fn schedule_vsync(&mut self, mode: VsyncRequest) -> bool {
        if !self.app_visible || self.vsync_request == mode {
            return false;
        }
        self.vsync_request = mode;
        true
    }

    pub fn set_surface_control(&mut self, sc: Option<SurfaceControl>) {
        if let Some(ref control) = sc {
            self.draw_client.update_resolution(control.width, control.height);
        }
        self.surface_control = sc;
    }

    /// Drops a reentrant call while a draw is in flight; otherwise
    /// drives `handle_on_frame` under the guard.
    pub fn on_frame(&mut self, seq: u32) {
        if self
            .frame_done
            .compare_exchange(true, false, Ordering::Acquire, Ordering::Acquire)
            .is_err()
        {
            debug!("onFrame({}) dropped, frame still in flight", seq);
            return;
        }
        self.handle_on_frame(seq);
        self.frame_done.store(true, Ordering::Release);
    }

    /// Returns the transaction to apply over IPC, or `None` if the
    /// frame was skipped (not visible, no surface, or no free buffer).
    fn handle_on_frame(&mut self, seq: u32) -> Option<Vec<LayerState>> {
        if !self.app_visible {
            debug!("onFrame({}): window not visible, skipping", seq);
            return None;
        }
        self.vsync_request = self.vsync_request.next();

        let producer = self.producer()?.clone();
        let key = producer.dequeue().ok()?;

        let (width, height) = self
            .surface_control
            .as_ref()
            .map(|sc| (sc.width, sc.height))
            .unwrap_or((0, 0));

        {
            let surface = producer.surface();
            let mut s = surface.borrow_mut();
            if let Some(item) = s.get_mut(key) {
                self.draw_client.draw_frame(item.region.as_mut_slice(), width, height);
            }
        }

        if !self.draw_client.finish_drawing() {
            debug!("onFrame({}): draw not finished, canceling buffer", seq);
            let _ = producer.cancel(key);
            return None;
        }

        producer.queue(key).ok()?;

        let token = self.layout_params.token;
        self.transaction.set_buffer(token, key);
        if let Some(crop) = self.draw_client.rect_crop() {
            self.transaction.set_buffer_crop(token, crop);
        }
        Some(self.transaction.drain())
    }

    pub fn handle_buffer_released(&mut self, buf_key: BufferKey) {
        if let Some(producer) = self.producer() {
            if producer.sync_free(buf_key).is_err() {
                debug!("bufferReleased({}) failed to sync", buf_key);
            }
        }
    }

    /// Toggles vsync request and, when the surface already exists, the
    /// visibility of the underlying draw client. Relayout (allocating
    /// or tearing down the surface) is the RPC layer's responsibility;
    /// this only reacts to the visibility edge.
    pub fn handle_app_visibility(&mut self, visible: bool) -> bool {
        if visible == self.app_visible {
            return false;
        }
        self.app_visible = visible;
        self.draw_client.update_visibility(visible);

        if !self.app_visible {
            self.vsync_request = VsyncRequest::None;
            false
        } else {
            self.schedule_vsync(VsyncRequest::Single)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_queue::{BufferConsumer, Surface};
    use crate::pixel::PixelFormat;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct StubDraw {
        finish: bool,
    }

    impl DrawClient for StubDraw {
        fn draw_frame(&mut self, buffer: &mut [u8], _width: u32, _height: u32) {
            if let Some(b) = buffer.first_mut() {
                *b = 0xAB;
            }
        }
        fn finish_drawing(&mut self) -> bool {
            self.finish
        }
        fn rect_crop(&self) -> Option<Rect> {
            None
        }
    }

    fn surface_control(token: u64) -> (SurfaceControl, BufferConsumer) {
        let keys = vec![0, 1];
        let surface = Rc::new(RefCell::new(Surface::new(token, 4, 4, PixelFormat::Argb8888, &keys).unwrap()));
        let producer = BufferProducer::new(surface.clone());
        let consumer = BufferConsumer::new(surface);
        (
            SurfaceControl {
                token,
                width: 4,
                height: 4,
                format: PixelFormat::Argb8888,
                buffer_keys: keys,
                producer,
            },
            consumer,
        )
    }

    #[test]
    fn reentrant_on_frame_is_dropped() {
        let lp = LayoutParams { token: 1, ..Default::default() };
        let mut win = BaseWindow::new(lp, StubDraw { finish: true });
        win.handle_app_visibility(true);
        let (sc, _consumer) = surface_control(1);
        win.set_surface_control(Some(sc));

        win.frame_done.store(false, Ordering::Release);
        win.on_frame(2);
        assert!(!win.frame_done.load(Ordering::Acquire));
        win.frame_done.store(true, Ordering::Release);
    }

    #[test]
    fn visible_window_dequeues_draws_and_queues() {
        let lp = LayoutParams { token: 1, ..Default::default() };
        let mut win = BaseWindow::new(lp, StubDraw { finish: true });
        win.handle_app_visibility(true);
        let (sc, _consumer) = surface_control(1);
        win.set_surface_control(Some(sc));

        let out = win.handle_on_frame(1);
        assert!(out.is_some());
        assert_eq!(out.unwrap().len(), 1);
    }

    #[test]
    fn unfinished_draw_cancels_buffer() {
        let lp = LayoutParams { token: 1, ..Default::default() };
        let mut win = BaseWindow::new(lp, StubDraw { finish: false });
        win.handle_app_visibility(true);
        let (sc, _consumer) = surface_control(1);
        win.set_surface_control(Some(sc));

        let out = win.handle_on_frame(1);
        assert!(out.is_none());
    }

    #[test]
    fn invisible_window_skips_frame() {
        let lp = LayoutParams { token: 1, ..Default::default() };
        let mut win = BaseWindow::new(lp, StubDraw { finish: true });
        assert!(win.handle_on_frame(1).is_none());
    }
}
