pub mod renderer;
pub mod state;
pub mod token;

use std::collections::HashMap;
use std::rc::Rc;
use std::cell::RefCell;

use wm_utils::log::{debug, error, info};

use crate::buffer_queue::{BufferConsumer, BufferKey, BufferProducer, Surface};
use crate::error::{WmError, WmResult};
use crate::input::gesture::GestureDetector;
use crate::input::message::{GestureBits, InputMessageState};
use crate::input::{InputChannel, InputDispatcher, InputMessage};
use crate::layout::{LayoutParams, Rect, Visibility};
use crate::pixel::PixelFormat;
use crate::transaction::{LayerFlags, LayerState};
use crate::vsync::VsyncRequest;
use crate::window::renderer::{NodeId, Renderer};
use crate::window::state::{AnimationPhase, WindowState};
use crate::window::token::{ClientHandle, ClientVisibility, WindowToken};

/// Default number of shared-memory buffers allocated per surface.
pub const DEFAULT_BUFFER_COUNT: usize = 2;

/// Server-side handle returned by `relayout`/`addWindow`'s surface
/// allocation: the client's face of the buffer pool plus the format
/// contract. Grounded on common/SurfaceControl.{h,cpp}.
#[derive(Clone)]
pub struct SurfaceControl {
    pub token: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub buffer_keys: Vec<BufferKey>,
    pub producer: BufferProducer,
}

/// Central server authority: window/token registries, visibility
/// lifecycle, animation completion barrier, composition driver.
///
/// Grounded on server/WindowManagerService.{h,cpp}. Per §9's "global
/// mutable state" note, the vsync timer itself is not a field here —
/// it lives in `ServiceContext`, which drives this service.
pub struct WindowService {
    tokens: HashMap<u64, WindowToken>,
    windows: HashMap<ClientHandle, WindowState>,
    monitors: HashMap<u64, InputDispatcher>,
    display_width: i32,
    display_height: i32,
    /// Insertion-order stacking list; the last entry is topmost. The
    /// source has no explicit z-order API (addWindow/relayout are the
    /// only placement calls), so arrival order stands in for it.
    z_order: Vec<ClientHandle>,
    focused: Option<ClientHandle>,
    gesture: GestureDetector,
}

impl WindowService {
    pub fn new(display_width: i32, display_height: i32) -> Self {
        Self {
            tokens: HashMap::new(),
            windows: HashMap::new(),
            monitors: HashMap::new(),
            display_width,
            display_height,
            z_order: Vec::new(),
            focused: None,
            gesture: GestureDetector::new(display_width, display_height, true),
        }
    }

    pub fn windows(&self) -> &HashMap<ClientHandle, WindowState> {
        &self.windows
    }

    pub fn tokens(&self) -> &HashMap<u64, WindowToken> {
        &self.tokens
    }

    /// Idempotent-by-warn: a duplicate registration is rejected with a
    /// log and success is returned. Per the Open Question in §9, a
    /// second registration with a different `window_type` keeps the
    /// first.
    pub fn add_window_token(&mut self, id: u64, window_type: crate::layout::WindowType, display_id: i32, client_pid: i32) {
        if self.tokens.contains_key(&id) {
            info!("addWindowToken: token {} already registered, keeping existing", id);
            return;
        }
        self.tokens.insert(id, WindowToken::new(id, window_type, display_id, client_pid));
    }

    /// Schedules removal: retained while `persistOnEmpty` is set or
    /// children remain, else evicted immediately.
    pub fn remove_window_token(&mut self, id: u64, _display_id: i32) {
        let evict = match self.tokens.get(&id) {
            Some(t) => !t.is_persist_on_empty() && t.is_empty(),
            None => return,
        };
        if evict {
            self.tokens.remove(&id);
        } else if let Some(t) = self.tokens.get_mut(&id) {
            t.mark_removed();
        }
    }

    pub fn add_window(
        &mut self,
        client: ClientHandle,
        mut layout_params: LayoutParams,
        visibility: Visibility,
    ) -> WmResult<Option<InputChannel>> {
        if self.windows.contains_key(&client) {
            info!("addWindow: client {} already has a window, ignoring", client);
            return Ok(None);
        }

        layout_params.resolve(self.display_width, self.display_height);
        let token_id = layout_params.token;

        let token = self.tokens.get_mut(&token_id).ok_or(WmError::UnknownToken)?;
        token.add_window(client);

        let input_channel = if layout_params.has_input() {
            let dispatcher = InputDispatcher::create(format!("win-{}", client));
            let channel = dispatcher.channel();
            let mut state = WindowState::new(client, token_id, layout_params, visibility);
            state.input_dispatcher = Some(dispatcher);
            self.windows.insert(client, state);
            Some(channel)
        } else {
            let state = WindowState::new(client, token_id, layout_params, visibility);
            self.windows.insert(client, state);
            None
        };

        self.z_order.push(client);
        if self.focused.is_none() {
            self.focused = Some(client);
        }

        Ok(input_channel)
    }

    pub fn remove_window(&mut self, client: ClientHandle) {
        if let Some(state) = self.windows.get_mut(&client) {
            state.pending_removal = true;
        }
    }

    /// Reconciles geometry; reparents on type change; allocates backing
    /// buffers on first transition to VISIBLE without a surface.
    pub fn relayout(
        &mut self,
        client: ClientHandle,
        mut layout_params: LayoutParams,
        width: i32,
        height: i32,
        visibility: Visibility,
        renderer: &mut dyn Renderer,
    ) -> WmResult<SurfaceControl> {
        layout_params.resolve(self.display_width, self.display_height);

        let type_changed = {
            let state = self.windows.get(&client).ok_or(WmError::NoSurface)?;
            state.layout_params.window_type != layout_params.window_type
        };

        let node = {
            let state = self.windows.get_mut(&client).ok_or(WmError::NoSurface)?;
            let becoming_visible = visibility == Visibility::Visible && !state.is_visible();
            state.layout_params = layout_params.clone();
            state.visibility = visibility;
            if becoming_visible {
                state.drawn_since_visible = false;
            }
            *state.node.get_or_insert_with(|| renderer.get_window(client))
        };

        if type_changed {
            let root = renderer.get_root();
            renderer.reparent(node, root);
        }

        let state = self.windows.get_mut(&client).ok_or(WmError::NoSurface)?;

        if !state.has_surface && visibility == Visibility::Visible {
            let format = PixelFormat::from_i32(layout_params.format).unwrap_or_default();
            let keys: Vec<BufferKey> = (0..DEFAULT_BUFFER_COUNT as i32).collect();
            let surface = Rc::new(RefCell::new(Surface::new(
                client,
                width.max(0) as u32,
                height.max(0) as u32,
                format,
                &keys,
            )?));
            let producer = BufferProducer::new(surface.clone());
            let consumer = BufferConsumer::new(surface.clone());
            state.buffer_consumer = Some(consumer);
            state.has_surface = true;

            return Ok(SurfaceControl {
                token: state.token,
                width: width.max(0) as u32,
                height: height.max(0) as u32,
                format,
                buffer_keys: keys,
                producer,
            });
        }

        let consumer = state.buffer_consumer.as_ref().ok_or(WmError::NoSurface)?;
        let surface = consumer.surface();
        let (w, h, format) = {
            let s = surface.borrow();
            (s.width, s.height, s.format)
        };
        Ok(SurfaceControl {
            token: state.token,
            width: w,
            height: h,
            format,
            buffer_keys: (0..DEFAULT_BUFFER_COUNT as i32).collect(),
            producer: BufferProducer::new(surface),
        })
    }

    /// Groups by window (LayerState.token identifies the window's own
    /// client handle, matching the source's transaction map keyed by
    /// each window's IWindow reference, not the parent WindowToken),
    /// applies each per §4.5.1, then enables vsync for visible windows.
    pub fn apply_transaction(&mut self, entries: Vec<LayerState>, renderer: &mut dyn Renderer) -> Vec<(ClientHandle, BufferKey)> {
        let mut released = Vec::new();
        for entry in entries {
            let client = entry.token;
            match self.apply_one(client, &entry, renderer, &mut released) {
                Ok(()) => {
                    if let Some(state) = self.windows.get_mut(&client) {
                        if state.is_visible() && !state.vsync_request.is_subscribed() {
                            state.vsync_request = VsyncRequest::Single;
                        }
                    }
                }
                Err(e) => debug!("applyTransaction: skipping window {}: {:?}", client, e),
            }
        }
        released
    }

    fn apply_one(
        &mut self,
        client: ClientHandle,
        entry: &LayerState,
        renderer: &mut dyn Renderer,
        released: &mut Vec<(ClientHandle, BufferKey)>,
    ) -> WmResult<()> {
        let node = {
            let state = self.windows.get(&client).ok_or(WmError::NoSurface)?;
            state.node.ok_or(WmError::NoSurface)?
        };

        let animating = self
            .windows
            .get(&client)
            .map(|s| s.animation == AnimationPhase::ShowRunning)
            .unwrap_or(false);
        if animating && !entry.has(LayerFlags::BUFFER_CHANGED) {
            return Ok(());
        }

        if entry.has(LayerFlags::BUFFER_CROP_CHANGED) {
            if let Some(state) = self.windows.get_mut(&client) {
                state.crop = entry.buffer_crop;
            }
        }
        if entry.has(LayerFlags::POSITION_CHANGED) {
            if let Some((x, y)) = entry.position {
                if let Some(state) = self.windows.get_mut(&client) {
                    state.position = (x, y);
                }
                renderer.set_position(node, x, y);
            }
        }
        if entry.has(LayerFlags::ALPHA_CHANGED) {
            if let Some(alpha) = entry.alpha {
                if let Some(state) = self.windows.get_mut(&client) {
                    state.alpha = alpha;
                }
                renderer.set_alpha(node, alpha);
            }
        }

        if entry.has(LayerFlags::BUFFER_CHANGED) {
            let key = entry.buffer_key.ok_or(WmError::InvalidState)?;

            let prev = {
                let state = self.windows.get_mut(&client).ok_or(WmError::NoSurface)?;
                if !state.drawn_since_visible {
                    state.start_show_animation();
                    state.drawn_since_visible = true;
                }
                state.current_buffer.replace(key)
            };

            let consumer = {
                let state = self.windows.get(&client).ok_or(WmError::NoSurface)?;
                state.buffer_consumer.clone().ok_or(WmError::NoSurface)?
            };

            consumer.sync_queued(key)?;
            let acquired = consumer.acquire()?;

            let crop = self
                .windows
                .get(&client)
                .and_then(|s| s.crop)
                .map(|r: Rect| (r.left, r.top, r.right, r.bottom));

            {
                let surface = consumer.surface();
                let s = surface.borrow();
                if let Some(item) = s.get(acquired) {
                    renderer.draw_frame(node, item.region.as_slice(), crop);
                }
            }

            if let Some(prev_key) = prev {
                if prev_key != acquired {
                    consumer.release(prev_key)?;
                    released.push((client, prev_key));
                }
            }
        }

        Ok(())
    }

    pub fn request_vsync(&mut self, client: ClientHandle, mode: VsyncRequest) -> WmResult<()> {
        let state = self.windows.get_mut(&client).ok_or(WmError::NoSurface)?;
        state.vsync_request = mode;
        Ok(())
    }

    pub fn any_subscribed(&self) -> bool {
        self.windows.values().any(|w| w.vsync_request.is_subscribed())
    }

    /// Advances every subscribed window's request and returns the set
    /// that should receive `onFrame` this vsync.
    pub fn on_vsync(&mut self) -> Vec<ClientHandle> {
        let mut fire = Vec::new();
        for (client, state) in self.windows.iter_mut() {
            if state.vsync_request.is_subscribed() {
                fire.push(*client);
                state.frame_seq += 1;
                state.vsync_request = state.vsync_request.next();
            }
        }
        fire
    }

    /// Explicit input focus for keypad routing; the source has no such
    /// API (target resolution is entirely TODO there), so arrival order
    /// is the default (see `z_order`) until a client claims focus.
    pub fn set_focus(&mut self, client: ClientHandle) {
        self.focused = Some(client);
    }

    fn topmost_at(&self, x: i32, y: i32) -> Option<ClientHandle> {
        self.z_order.iter().rev().copied().find(|client| {
            match self.windows.get(client) {
                Some(w) if w.is_visible() => {
                    let (px, py) = w.position;
                    let (pw, ph) = (w.layout_params.width, w.layout_params.height);
                    x >= px && x < px + pw && y >= py && y < py + ph
                }
                _ => false,
            }
        })
    }

    fn fan_out(&self, target: Option<ClientHandle>, msg: InputMessage) {
        let client = match target {
            Some(c) => c,
            None => return,
        };
        let state = match self.windows.get(&client) {
            Some(s) => s,
            None => return,
        };
        if let Some(dispatcher) = &state.input_dispatcher {
            let _ = dispatcher.send_message(msg);
        }
        if let Some(monitor) = self.monitors.get(&state.token) {
            let _ = monitor.send_message(msg);
        }
    }

    /// Server-side ingress for §4.4: resolves the topmost window at
    /// `(raw_x, raw_y)`, maps to window-local coordinates, runs the
    /// gesture recognizer, and fans the annotated message out to the
    /// target window's channel and any monitor registered on its token.
    pub fn dispatch_pointer_input(&mut self, state: InputMessageState, raw_x: i32, raw_y: i32) {
        let target = self.topmost_at(raw_x, raw_y);
        let (x, y) = match target.and_then(|c| self.windows.get(&c)) {
            Some(w) => (raw_x - w.position.0, raw_y - w.position.1),
            None => (raw_x, raw_y),
        };
        // Screen-edge strips are measured in screen space, so the
        // recognizer sees raw_x/raw_y even though the dispatched message
        // carries window-local x/y for the target window.
        let gesture_state = self
            .gesture
            .recognize(&InputMessage::pointer(state, raw_x, raw_y, raw_x, raw_y, GestureBits::empty()));
        let msg = InputMessage::pointer(state, raw_x, raw_y, x, y, gesture_state);
        self.fan_out(target, msg);
    }

    /// Server-side ingress for keypad events: routed to the focused
    /// window rather than resolved by pointer location.
    pub fn dispatch_key_input(&mut self, state: InputMessageState, key_code: i32) {
        let msg = InputMessage::keypad(state, key_code);
        self.fan_out(self.focused, msg);
    }

    pub fn monitor_input(&mut self, token: u64, name: impl Into<String>, _display_id: i32) -> InputChannel {
        let dispatcher = InputDispatcher::create(name);
        let channel = dispatcher.channel();
        self.monitors.insert(token, dispatcher);
        channel
    }

    pub fn release_input(&mut self, token: u64) {
        self.monitors.remove(&token);
    }

    /// §4.5.2: client-facing visibility is not identical to child
    /// visibility; HOLD freezes the current effective state.
    pub fn update_window_token_visibility(&mut self, token_id: u64, new: ClientVisibility, renderer: &mut dyn Renderer) {
        let (children, changed) = {
            let token = match self.tokens.get_mut(&token_id) {
                Some(t) => t,
                None => return,
            };
            if new == ClientVisibility::Hold {
                return;
            }
            let was_visible = token.client_visibility() == ClientVisibility::Visible;
            let now_visible = new == ClientVisibility::Visible;
            token.set_client_visibility(new);
            (token.children().to_vec(), was_visible != now_visible)
        };

        if !changed {
            return;
        }
        let effective = new == ClientVisibility::Visible;

        for client in children {
            let node = self.windows.get(&client).and_then(|s| s.node);
            let state = match self.windows.get_mut(&client) {
                Some(s) => s,
                None => continue,
            };
            state.cancel_animation();
            state.visibility = if effective { Visibility::Visible } else { Visibility::Invisible };

            if !effective {
                state.vsync_request = VsyncRequest::None;
                state.start_hide_animation();
            } else {
                state.vsync_request = match state.vsync_request {
                    VsyncRequest::None => VsyncRequest::Single,
                    other => other,
                };
                state.drawn_since_visible = false;
                if let Some(n) = node {
                    renderer.update_visibility(n, true);
                }
            }
        }
    }

    /// §4.5.3: gated by animation state. Returns true if the window was
    /// actually torn down this call.
    pub fn remove_if_possible(&mut self, client: ClientHandle, renderer: &mut dyn Renderer) -> bool {
        let animating = match self.windows.get(&client) {
            Some(s) => s.is_animating(),
            None => return false,
        };

        if animating {
            if let Some(s) = self.windows.get_mut(&client) {
                s.pending_removal = true;
            }
            return false;
        }

        self.teardown_window(client, renderer);
        true
    }

    /// Called by the animation runtime's completion callback, whether
    /// it fires synchronously or asynchronously.
    pub fn on_animation_finished(&mut self, client: ClientHandle, renderer: &mut dyn Renderer) {
        let (pending, node, now_visible) = match self.windows.get_mut(&client) {
            Some(s) => {
                let was_hide = s.animation == AnimationPhase::HideRunning;
                s.finish_animation();
                (s.pending_removal, s.node, !was_hide)
            }
            None => return,
        };

        if !now_visible {
            if let Some(n) = node {
                renderer.update_visibility(n, false);
            }
        }

        if pending {
            self.remove_if_possible(client, renderer);
        }
    }

    fn teardown_window(&mut self, client: ClientHandle, renderer: &mut dyn Renderer) {
        if let Some(state) = self.windows.remove(&client) {
            if let Some(n) = state.node {
                renderer.update_visibility(n, false);
            }
            if let Some(token) = self.tokens.get_mut(&state.token) {
                token.remove_window(client);
                if token.is_removed() && token.is_empty() && !token.is_persist_on_empty() {
                    self.tokens.remove(&state.token);
                }
            }
        }
        self.z_order.retain(|c| *c != client);
        if self.focused == Some(client) {
            self.focused = self.z_order.last().copied();
        }
    }

    /// §4.5.4: a client death notification tears down every token owned
    /// by that pid in bulk, without waiting on animations.
    pub fn client_died(&mut self, client_pid: i32, renderer: &mut dyn Renderer) {
        error!("client {} died, tearing down its windows", client_pid);
        let dead_tokens: Vec<u64> = self
            .tokens
            .iter()
            .filter(|(_, t)| t.client_pid == client_pid)
            .map(|(id, _)| *id)
            .collect();

        for token_id in dead_tokens {
            self.remove_window_token_inner(token_id, renderer);
        }
    }

    fn remove_window_token_inner(&mut self, token_id: u64, renderer: &mut dyn Renderer) {
        let children = match self.tokens.get(&token_id) {
            Some(t) => t.children().to_vec(),
            None => return,
        };
        for client in children {
            self.teardown_window(client, renderer);
        }
        self.tokens.remove(&token_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::WindowType;
    use crate::window::renderer::DummyRenderer;

    fn service_with_window(client: ClientHandle, token: u64) -> WindowService {
        let mut svc = WindowService::new(480, 480);
        svc.add_window_token(token, WindowType::Application, 0, 1);
        let lp = LayoutParams { token, ..Default::default() };
        svc.add_window(client, lp, Visibility::Visible).unwrap();
        svc
    }

    #[test]
    fn duplicate_token_keeps_first_type() {
        let mut svc = WindowService::new(480, 480);
        svc.add_window_token(1, WindowType::Application, 0, 1);
        svc.add_window_token(1, WindowType::Dialog, 0, 1);
        assert_eq!(svc.tokens().get(&1).unwrap().window_type, WindowType::Application);
    }

    #[test]
    fn add_window_with_unknown_token_is_rejected() {
        let mut svc = WindowService::new(480, 480);
        let lp = LayoutParams { token: 99, ..Default::default() };
        assert_eq!(svc.add_window(1, lp, Visibility::Visible), Err(WmError::UnknownToken));
    }

    #[test]
    fn visibility_hold_freezes_children() {
        let mut svc = service_with_window(100, 1);
        let mut renderer = DummyRenderer::new();
        svc.update_window_token_visibility(1, ClientVisibility::Hold, &mut renderer);
        let win = svc.windows().get(&100).unwrap();
        assert_eq!(win.visibility, Visibility::Visible);
    }

    #[test]
    fn visibility_gone_defers_invisible_dispatch_to_animation_completion() {
        let mut svc = service_with_window(100, 1);
        svc.request_vsync(100, VsyncRequest::Periodic).unwrap();
        let mut renderer = DummyRenderer::new();
        svc.update_window_token_visibility(1, ClientVisibility::Gone, &mut renderer);
        {
            let win = svc.windows().get(&100).unwrap();
            assert_eq!(win.visibility, Visibility::Invisible);
            assert_eq!(win.vsync_request, VsyncRequest::None);
            assert_eq!(win.animation, AnimationPhase::HideRunning);
        }

        svc.on_animation_finished(100, &mut renderer);
        assert_eq!(svc.windows().get(&100).unwrap().animation, AnimationPhase::Idle);
    }

    #[test]
    fn animation_gated_removal_defers_then_tears_down() {
        let mut svc = service_with_window(100, 1);
        let mut renderer = DummyRenderer::new();

        svc.windows.get_mut(&100).unwrap().start_hide_animation();
        let torn_down = svc.remove_if_possible(100, &mut renderer);
        assert!(!torn_down);
        assert!(svc.windows().contains_key(&100));
        assert!(svc.windows().get(&100).unwrap().pending_removal);

        svc.on_animation_finished(100, &mut renderer);
        assert!(!svc.windows().contains_key(&100));
    }

    #[test]
    fn client_death_tears_down_all_its_tokens() {
        let mut svc = service_with_window(100, 1);
        let mut renderer = DummyRenderer::new();
        svc.client_died(1, &mut renderer);
        assert!(svc.windows().is_empty());
        assert!(svc.tokens().is_empty());
    }

    #[test]
    fn pointer_input_is_delivered_to_topmost_window_and_its_monitor() {
        let mut svc = service_with_window(100, 1);
        let monitor_channel = svc.monitor_input(1, "mon", 0);

        svc.dispatch_pointer_input(InputMessageState::Pressed, 100, 100);

        let win = svc.windows().get(&100).unwrap();
        let delivered = win.input_dispatcher.as_ref().unwrap().channel().receive().unwrap();
        assert_eq!(delivered.state, InputMessageState::Pressed);
        assert!(monitor_channel.receive().is_some());
    }

    #[test]
    fn pointer_outside_every_window_is_dropped_silently() {
        let mut svc = service_with_window(100, 1);
        svc.dispatch_pointer_input(InputMessageState::Pressed, 10_000, 10_000);
        let win = svc.windows().get(&100).unwrap();
        assert!(win.input_dispatcher.as_ref().unwrap().channel().is_empty());
    }

    #[test]
    fn key_input_routes_to_focused_window() {
        let mut svc = service_with_window(100, 1);
        svc.dispatch_key_input(InputMessageState::Pressed, 42);
        let win = svc.windows().get(&100).unwrap();
        let delivered = win.input_dispatcher.as_ref().unwrap().channel().receive().unwrap();
        assert_eq!(delivered.state, InputMessageState::Pressed);
    }
}
