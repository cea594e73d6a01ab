pub mod message;
pub mod gesture;
pub mod monitor;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::{WmError, WmResult};
use wm_utils::log::error;

pub use message::{InputMessage, MAX_MSG};

/// A named, bounded, single-writer/single-reader queue between one
/// server-side window and its client. The mqueue primitive itself is an
/// external-OS collaborator per §1; this struct models the transport
/// contract (capacity, non-blocking send, FIFO delivery) the core
/// depends on.
#[derive(Debug)]
struct InputChannelInner {
    name: String,
    queue: VecDeque<InputMessage>,
}

#[derive(Debug, Clone)]
pub struct InputChannel {
    inner: Rc<RefCell<InputChannelInner>>,
}

impl InputChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(InputChannelInner {
                name: name.into(),
                queue: VecDeque::with_capacity(MAX_MSG),
            })),
        }
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn is_valid(&self) -> bool {
        true
    }

    fn push(&self, msg: InputMessage) -> WmResult<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.queue.len() >= MAX_MSG {
            return Err(WmError::QueueFull);
        }
        inner.queue.push_back(msg);
        Ok(())
    }

    pub fn receive(&self) -> Option<InputMessage> {
        self.inner.borrow_mut().queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Server-side write endpoint. `send_message` is the only send path and
/// matches the source's fixed 100ms-timeout `mq_send`: here, "timeout"
/// collapses to an immediate fail-fast since the queue is in-process,
/// but the policy is identical — log once, drop, never retry.
#[derive(Debug, Clone)]
pub struct InputDispatcher {
    channel: InputChannel,
}

impl InputDispatcher {
    pub fn create(name: impl Into<String>) -> Self {
        Self {
            channel: InputChannel::new(name),
        }
    }

    pub fn channel(&self) -> InputChannel {
        self.channel.clone()
    }

    pub fn send_message(&self, msg: InputMessage) -> WmResult<()> {
        match self.channel.push(msg) {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("send message to {} failed: queue full", self.channel.name());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::message::{GestureBits, InputMessageState};

    fn msg() -> InputMessage {
        InputMessage::pointer(InputMessageState::Pressed, 0, 0, 0, 0, GestureBits::empty())
    }

    #[test]
    fn full_queue_drops_and_logs() {
        let d = InputDispatcher::create("win-1");
        for _ in 0..MAX_MSG {
            d.send_message(msg()).unwrap();
        }
        assert_eq!(d.send_message(msg()), Err(WmError::QueueFull));
        assert_eq!(d.channel().len(), MAX_MSG);
    }

    #[test]
    fn messages_are_delivered_fifo() {
        let d = InputDispatcher::create("win-1");
        let a = InputMessage::pointer(InputMessageState::Pressed, 1, 1, 1, 1, GestureBits::empty());
        let b = InputMessage::pointer(InputMessageState::Released, 2, 2, 2, 2, GestureBits::empty());
        d.send_message(a).unwrap();
        d.send_message(b).unwrap();

        let chan = d.channel();
        assert_eq!(chan.receive(), Some(a));
        assert_eq!(chan.receive(), Some(b));
        assert_eq!(chan.receive(), None);
    }
}
