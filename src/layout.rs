// Window attributes and the crop rectangle shape used by LayerState.
use crate::pixel::PixelFormat;

pub const MATCH_PARENT: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    Application,
    SystemWindow,
    Dialog,
    Toast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Invisible,
    Visible,
    Gone,
}

bitflags::bitflags! {
    pub struct InputFeatures: u8 {
        /// Does not construct an input channel for this window; it is
        /// therefore incapable of receiving input.
        const NO_INPUT_CHANNEL = 1 << 0;
    }
}

/// A rectangle expressed as two corners, inclusive of `left`/`top` and
/// exclusive of `right`/`bottom`. Used for buffer crops and display bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Window attributes supplied by a client on `addWindow`/`relayout`.
///
/// `token` is resolved against `WindowService::tokens` by id rather than
/// held as a live reference, so LayoutParams stays plain data.
#[derive(Debug, Clone)]
pub struct LayoutParams {
    pub width: i32,
    pub height: i32,
    pub x: i32,
    pub y: i32,
    pub window_type: WindowType,
    pub flags: u32,
    pub format: i32,
    pub token: u64,
    pub input_features: InputFeatures,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            width: MATCH_PARENT,
            height: MATCH_PARENT,
            x: 0,
            y: 0,
            window_type: WindowType::Application,
            flags: 0,
            format: PixelFormat::Argb8888 as i32,
            token: 0,
            input_features: InputFeatures::empty(),
        }
    }
}

impl LayoutParams {
    pub fn has_input(&self) -> bool {
        !self.input_features.contains(InputFeatures::NO_INPUT_CHANNEL)
    }

    /// Resolve MATCH_PARENT sizes against the display, clamping explicit
    /// sizes the way the client resolves them before handing attrs to the
    /// server (see BaseWindow::setLayoutParams in the source this is
    /// grounded on).
    pub fn resolve(&mut self, display_width: i32, display_height: i32) {
        self.width = if self.width < 0 {
            display_width
        } else {
            self.width.clamp(0, display_width * 2)
        };
        self.height = if self.height < 0 {
            display_height
        } else {
            self.height.clamp(0, display_height * 2)
        };
    }
}
