//! Server-side proxy between the study-assistant frontend and Google Gemini
//!
//! Keeps the Gemini API key on the server: the browser posts its conversation
//! here, the proxy shapes it into a `generateContent` call, and relays or
//! translates whatever comes back.

pub mod ai;
pub mod error;
pub mod models;
pub mod payload;
pub mod proxy;
pub mod server;

pub use error::{Error, Result};
