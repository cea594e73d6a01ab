//! Core subsystems for a lightweight window manager: a fixed-slot
//! shared-memory buffer queue, a per-window vsync scheduler, an atomic
//! surface-transaction pipeline, input transport with an edge-swipe
//! gesture recognizer, and the window/token registry that ties them
//! together.
//!
//! The display driver, IPC transport, UI toolkit, platform event loop,
//! and raw shared-memory/message-queue primitives are external
//! collaborators named by interface only (see `window::renderer::Renderer`
//! and `client::DrawClient`) — this crate owns the state machines, not
//! the I/O around them.

pub mod buffer_queue;
pub mod client;
pub mod error;
pub mod input;
pub mod layout;
pub mod pixel;
pub mod service_context;
pub mod transaction;
pub mod vsync;
pub mod window;

pub use error::{WmError, WmResult};
