// Error taxonomy for the window manager core.
//
// Per the error handling design, core operations never unwind across the
// event-loop boundary: every failure here becomes a skip-frame marker in
// FrameMeta, a status code on an RPC-shaped return, or a logged drop. This
// enum exists so call sites can match on *kind* rather than stringly-typed
// messages, the way BufferQueue::toState and friends report failure as a
// bool in the source this is grounded on.
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WmError {
    #[error("buffer queue operation attempted from an invalid state")]
    InvalidState,

    #[error("no buffer available to dequeue")]
    NoBufferAvailable,

    #[error("window has no surface")]
    NoSurface,

    #[error("window token already registered")]
    DuplicateToken,

    #[error("window already registered for this client")]
    DuplicateWindow,

    #[error("layout params reference an unknown token")]
    UnknownToken,

    #[error("input queue is full")]
    QueueFull,

    #[error("client process died")]
    ClientDied,
}

pub type WmResult<T> = std::result::Result<T, WmError>;
