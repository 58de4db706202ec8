pub mod auth;
pub mod blocking;
pub mod capture;
pub mod client;
pub mod error;
pub mod health;
pub mod operator;
pub mod pages;
pub mod render;
pub mod server;
pub mod shutdown;

pub use auth::AuthGate;
pub use capture::CaptureState;
pub use error::{CaptureError, OperatorError, ServerError};
pub use operator::OperatorState;
pub use render::{CodeRenderer, QrCodeRenderer, RenderError};
pub use server::{start, ServerHandle};
