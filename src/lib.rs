//! glance - streamed image analysis client
//!
//! Sends an image (local file or URL) and a prompt to an analysis server and
//! renders the answer as it streams back, until the server's end-of-answer
//! marker arrives or the stream ends.

pub mod config;
pub mod decoder;
pub mod error;
pub mod presenter;
pub mod renderer;
pub mod sentinel;
pub mod session;
pub mod transcript;
pub mod transport;
pub mod types;

pub use config::{GlanceConfig, Theme};
pub use error::{GlanceError, Result};
pub use presenter::{MemoryPresenter, Presenter, TerminalPresenter};
pub use renderer::StreamRenderer;
pub use session::{Command, LineAction, Reply, Session};
pub use transcript::Transcript;
pub use transport::{HttpTransport, Transport};
pub use types::*;
