// Fixed-size input message wire layout, per §6 EXTERNAL INTERFACES.
use bitflags::bitflags;

pub const MAX_MSG: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMessageType {
    Pointer,
    Keypad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMessageState {
    Pressed,
    Released,
}

bitflags! {
    pub struct GestureBits: u8 {
        const SWIPE_UP    = 1 << 0;
        const SWIPE_DOWN  = 1 << 1;
        const SWIPE_LEFT  = 1 << 2;
        const SWIPE_RIGHT = 1 << 3;
        const TRIGGER_X   = 1 << 4;
        const TRIGGER_Y   = 1 << 5;
        const SCREEN_OFF  = 1 << 6;
    }
}

impl GestureBits {
    pub fn is_x_swipe(self) -> bool {
        self.intersects(GestureBits::SWIPE_LEFT | GestureBits::SWIPE_RIGHT)
    }

    pub fn is_y_swipe(self) -> bool {
        self.intersects(GestureBits::SWIPE_UP | GestureBits::SWIPE_DOWN)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerPayload {
    pub raw_x: i32,
    pub raw_y: i32,
    pub x: i32,
    pub y: i32,
    pub gesture_state: GestureBits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypadPayload {
    pub key_code: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMessagePayload {
    Pointer(PointerPayload),
    Keypad(KeypadPayload),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputMessage {
    pub msg_type: InputMessageType,
    pub state: InputMessageState,
    pub payload: InputMessagePayload,
}

impl InputMessage {
    pub fn pointer(state: InputMessageState, raw_x: i32, raw_y: i32, x: i32, y: i32, gesture_state: GestureBits) -> Self {
        Self {
            msg_type: InputMessageType::Pointer,
            state,
            payload: InputMessagePayload::Pointer(PointerPayload {
                raw_x,
                raw_y,
                x,
                y,
                gesture_state,
            }),
        }
    }

    pub fn keypad(state: InputMessageState, key_code: i32) -> Self {
        Self {
            msg_type: InputMessageType::Keypad,
            state,
            payload: InputMessagePayload::Keypad(KeypadPayload { key_code }),
        }
    }
}
