mod api;
mod channel;
mod clipboard;
mod config;
mod session;

pub use api::*;
pub use channel::*;
pub use clipboard::*;
pub use config::*;
pub use session::*;
