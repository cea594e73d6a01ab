// Edge-swipe gesture recognizer: pointer-only finite state machine.
//
// Ported near-verbatim from server/GestureDetector.h's `recognizeGesture`,
// including the edge-strip classification (note the inversion: the top
// strip sets swipe_down and the bottom strip sets swipe_up, since the
// gesture names the direction of travel implied by starting at that
// edge) and the re-press displacement check against INVALID_DISTANCE.
use crate::input::message::{GestureBits, InputMessage, InputMessageState, InputMessagePayload};

pub const TRIGGER_DISTANCE: i32 = 13;
pub const INVALID_DISTANCE: i32 = 57;

#[derive(Debug)]
pub struct GestureDetector {
    width: i32,
    height: i32,
    screen_on: bool,
    last_state: InputMessageState,
    swipe: GestureBits,
    pressed_x: i32,
    pressed_y: i32,
    last_x: i32,
    last_y: i32,
}

impl GestureDetector {
    /// `screen_on` starts from the platform key-value subscription;
    /// per §4.4 a missing subscription fd is a fatal configuration
    /// error whose fallback is `screen_on = true` (§7).
    pub fn new(width: i32, height: i32, screen_on: bool) -> Self {
        Self {
            width,
            height,
            screen_on,
            last_state: InputMessageState::Released,
            swipe: GestureBits::empty(),
            pressed_x: 0,
            pressed_y: 0,
            last_x: 0,
            last_y: 0,
        }
    }

    pub fn set_screen_on(&mut self, on: bool) {
        self.screen_on = on;
    }

    pub fn set_display_info(&mut self, width: i32, height: i32) {
        self.width = width;
        self.height = height;
    }

    /// Returns the emitted bitset for this message, or an empty set if
    /// no gesture event is emitted yet (matches `ret=0` paths in source).
    pub fn recognize(&mut self, msg: &InputMessage) -> GestureBits {
        let (x, y) = match msg.payload {
            InputMessagePayload::Pointer(p) => (p.x, p.y),
            InputMessagePayload::Keypad(_) => return GestureBits::empty(),
        };

        let mut ret = GestureBits::empty();

        match msg.state {
            InputMessageState::Pressed => {
                if !self.screen_on {
                    self.swipe.insert(GestureBits::SCREEN_OFF);
                    ret = self.swipe;
                    self.last_state = msg.state;
                    self.last_x = x;
                    self.last_y = y;
                    return ret;
                }

                if self.last_x == x && self.last_y == y {
                    return self.swipe;
                }

                if self.last_state == InputMessageState::Released {
                    self.pressed_x = x;
                    self.pressed_y = y;

                    let left = self.pressed_x.clamp(0, TRIGGER_DISTANCE);
                    let top = self.pressed_y.clamp(0, TRIGGER_DISTANCE);
                    let right = self.pressed_x.clamp(self.width - TRIGGER_DISTANCE, self.width);
                    let bottom = self.pressed_y.clamp(self.height - TRIGGER_DISTANCE, self.height);

                    if top == self.pressed_y {
                        self.swipe.insert(GestureBits::SWIPE_DOWN);
                    } else if bottom == self.pressed_y {
                        self.swipe.insert(GestureBits::SWIPE_UP);
                    } else if left == self.pressed_x {
                        self.swipe.insert(GestureBits::SWIPE_RIGHT);
                    } else if right == self.pressed_x {
                        self.swipe.insert(GestureBits::SWIPE_LEFT);
                    }

                    if !self.swipe.is_x_swipe() && !self.swipe.is_y_swipe() {
                        self.last_state = msg.state;
                        self.last_x = x;
                        self.last_y = y;
                        return GestureBits::empty();
                    }
                } else {
                    let x_trigger = (self.swipe.contains(GestureBits::SWIPE_LEFT)
                        && self.pressed_x - x >= INVALID_DISTANCE)
                        || (self.swipe.contains(GestureBits::SWIPE_RIGHT)
                            && x - self.pressed_x >= INVALID_DISTANCE);
                    let y_trigger = (self.swipe.contains(GestureBits::SWIPE_UP)
                        && self.pressed_y - y >= INVALID_DISTANCE)
                        || (self.swipe.contains(GestureBits::SWIPE_DOWN)
                            && y - self.pressed_y >= INVALID_DISTANCE);

                    if x_trigger {
                        self.swipe.insert(GestureBits::TRIGGER_X);
                    } else if y_trigger {
                        self.swipe.insert(GestureBits::TRIGGER_Y);
                    } else {
                        self.swipe.remove(GestureBits::TRIGGER_X | GestureBits::TRIGGER_Y);
                    }
                }
                ret = self.swipe;
            }
            InputMessageState::Released => {
                if !self.swipe.is_x_swipe()
                    && !self.swipe.is_y_swipe()
                    && !self.swipe.contains(GestureBits::SCREEN_OFF)
                {
                    self.last_state = msg.state;
                    self.last_x = x;
                    self.last_y = y;
                    return GestureBits::empty();
                }
                ret = self.swipe;
                self.swipe = GestureBits::empty();
            }
        }

        self.last_state = msg.state;
        self.last_x = x;
        self.last_y = y;
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::message::InputMessage;

    fn press(x: i32, y: i32) -> InputMessage {
        InputMessage::pointer(InputMessageState::Pressed, x, y, x, y, GestureBits::empty())
    }

    fn release(x: i32, y: i32) -> InputMessage {
        InputMessage::pointer(InputMessageState::Released, x, y, x, y, GestureBits::empty())
    }

    #[test]
    fn edge_swipe_left_then_trigger() {
        let mut gd = GestureDetector::new(480, 480, true);
        let first = gd.recognize(&press(475, 200));
        assert!(first.contains(GestureBits::SWIPE_LEFT));
        assert!(!first.contains(GestureBits::TRIGGER_X));

        let second = gd.recognize(&press(400, 200));
        assert!(second.contains(GestureBits::SWIPE_LEFT));
        assert!(second.contains(GestureBits::TRIGGER_X));
    }

    #[test]
    fn top_edge_sets_swipe_down() {
        let mut gd = GestureDetector::new(480, 480, true);
        let bits = gd.recognize(&press(200, 5));
        assert!(bits.contains(GestureBits::SWIPE_DOWN));
    }

    #[test]
    fn bottom_edge_sets_swipe_up() {
        let mut gd = GestureDetector::new(480, 480, true);
        let bits = gd.recognize(&press(200, 475));
        assert!(bits.contains(GestureBits::SWIPE_UP));
    }

    #[test]
    fn screen_off_short_circuits() {
        let mut gd = GestureDetector::new(480, 480, false);
        let bits = gd.recognize(&press(200, 200));
        assert!(bits.contains(GestureBits::SCREEN_OFF));
    }

    #[test]
    fn release_emits_final_bitset_and_clears() {
        let mut gd = GestureDetector::new(480, 480, true);
        gd.recognize(&press(475, 200));
        let bits = gd.recognize(&release(475, 200));
        assert!(bits.contains(GestureBits::SWIPE_LEFT));

        let after = gd.recognize(&press(300, 300));
        assert!(!after.contains(GestureBits::SWIPE_LEFT) || after.is_empty());
    }

    #[test]
    fn non_edge_press_emits_nothing() {
        let mut gd = GestureDetector::new(480, 480, true);
        let bits = gd.recognize(&press(200, 200));
        assert!(bits.is_empty());
    }
}
