// Client-side input monitor: wraps an InputChannel and ties a handler's
// lifetime to the monitor itself.
//
// Grounded on app/InputMonitor.cpp's start/stop pair: `stop()` nulls the
// event handler and the poll handle before the channel is torn down, so
// a readiness callback that fires mid-teardown observes no handler
// rather than a dangling one. The real reactor (`uv_poll_t` there,
// `FdWatch` here) is an external collaborator per §1; `poll()` stands in
// for the reactor invoking the registered callback on readiness.
use crate::error::{WmError, WmResult};
use crate::input::message::InputMessage;
use crate::input::InputChannel;

pub struct InputMonitor {
    channel: Option<InputChannel>,
    handler: Option<Box<dyn FnMut(&InputMessage)>>,
}

impl InputMonitor {
    pub fn new() -> Self {
        Self {
            channel: None,
            handler: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.channel.as_ref().map(|c| c.is_valid()).unwrap_or(false)
    }

    pub fn set_input_channel(&mut self, channel: InputChannel) {
        self.stop();
        self.channel = Some(channel);
    }

    pub fn start(&mut self, handler: impl FnMut(&InputMessage) + 'static) -> WmResult<()> {
        if !self.is_valid() {
            return Err(WmError::NoSurface);
        }
        self.handler = Some(Box::new(handler));
        Ok(())
    }

    /// Unregisters the handler before dropping the channel, matching the
    /// null-before-delete ordering in the source.
    pub fn stop(&mut self) {
        self.handler = None;
        self.channel = None;
    }

    /// Drains pending messages, invoking the handler for each. A no-op
    /// if `stop()` already cleared the handler, even if called reentrantly
    /// from within a handler invocation.
    pub fn poll(&mut self) {
        let channel = match &self.channel {
            Some(c) => c.clone(),
            None => return,
        };
        while let Some(msg) = channel.receive() {
            match self.handler.as_mut() {
                Some(h) => h(&msg),
                None => break,
            }
        }
    }
}

impl Default for InputMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InputMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::message::{GestureBits, InputMessageState};
    use crate::input::InputDispatcher;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn stop_clears_handler_before_channel() {
        let dispatcher = InputDispatcher::create("win-1");
        let mut monitor = InputMonitor::new();
        monitor.set_input_channel(dispatcher.channel());
        assert!(monitor.is_valid());
        monitor.stop();
        assert!(!monitor.is_valid());
    }

    #[test]
    fn poll_invokes_handler_for_each_pending_message() {
        let dispatcher = InputDispatcher::create("win-1");
        let mut monitor = InputMonitor::new();
        monitor.set_input_channel(dispatcher.channel());

        let seen = Rc::new(RefCell::new(0));
        let seen_clone = seen.clone();
        monitor.start(move |_msg| *seen_clone.borrow_mut() += 1).unwrap();

        let msg = InputMessage::pointer(InputMessageState::Pressed, 0, 0, 0, 0, GestureBits::empty());
        dispatcher.send_message(msg).unwrap();
        dispatcher.send_message(msg).unwrap();

        monitor.poll();
        assert_eq!(*seen.borrow(), 2);
    }

    #[test]
    fn start_without_channel_fails() {
        let mut monitor = InputMonitor::new();
        assert_eq!(monitor.start(|_| {}), Err(WmError::NoSurface));
    }
}
