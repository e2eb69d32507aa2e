// Zhenwo Engine — Native Rust chat client runtime
// Stream decoding, turn accumulation, content classification, and the
// thin session/auth/history layer around them.

pub mod auth;
pub mod chat;
pub mod events;
pub mod history;
pub mod render;
pub mod reply;
pub mod session;
pub mod state;
pub mod stream;
