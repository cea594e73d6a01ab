// WindowState: server-side per-window record.
//
// Grounded on server/WindowState.h. The animation engine itself
// (lvgl/anim_api, gated behind CONFIG_ENABLE_TRANSITION_ANIMATION in the
// source) is an external draw-client concern per §1; what this core
// owns is the completion barrier described in §9: an explicit
// `PendingRemoval` phase that the animation runtime's completion
// callback resolves, whether that callback fires synchronously
// (animation canceled inline) or asynchronously (animation ran to
// term).
use crate::buffer_queue::BufferConsumer;
use crate::input::InputDispatcher;
use crate::layout::{LayoutParams, Visibility};
use crate::vsync::VsyncRequest;
use crate::window::renderer::NodeId;
use crate::window::token::ClientHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    Idle,
    ShowRunning,
    HideRunning,
}

#[derive(Debug)]
pub struct WindowState {
    pub client: ClientHandle,
    pub token: u64,
    pub layout_params: LayoutParams,
    pub vsync_request: VsyncRequest,
    pub frame_seq: u32,
    pub visibility: Visibility,
    pub has_surface: bool,
    pub buffer_consumer: Option<BufferConsumer>,
    pub input_dispatcher: Option<InputDispatcher>,
    pub node: Option<NodeId>,
    pub animation: AnimationPhase,
    /// Set by `removeIfPossible` when an animation is still in flight;
    /// the animation completion callback re-invokes removal.
    pub pending_removal: bool,
    /// The buffer currently acquired and drawn, released when the next
    /// one lands.
    pub current_buffer: Option<crate::buffer_queue::BufferKey>,
    /// Cleared whenever the window transitions to visible; set once the
    /// first buffer since that transition has been drawn.
    pub drawn_since_visible: bool,
    pub crop: Option<crate::layout::Rect>,
    pub position: (i32, i32),
    pub alpha: f32,
}

impl WindowState {
    pub fn new(client: ClientHandle, token: u64, layout_params: LayoutParams, visibility: Visibility) -> Self {
        Self {
            client,
            token,
            layout_params,
            vsync_request: VsyncRequest::None,
            frame_seq: 0,
            visibility,
            has_surface: false,
            buffer_consumer: None,
            input_dispatcher: None,
            node: None,
            animation: AnimationPhase::Idle,
            pending_removal: false,
            current_buffer: None,
            drawn_since_visible: false,
            crop: None,
            position: (0, 0),
            alpha: 1.0,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }

    pub fn is_animating(&self) -> bool {
        !matches!(self.animation, AnimationPhase::Idle)
    }

    pub fn cancel_animation(&mut self) {
        self.animation = AnimationPhase::Idle;
    }

    pub fn start_show_animation(&mut self) {
        self.animation = AnimationPhase::ShowRunning;
    }

    pub fn start_hide_animation(&mut self) {
        self.animation = AnimationPhase::HideRunning;
    }

    pub fn finish_animation(&mut self) {
        self.animation = AnimationPhase::Idle;
    }
}
