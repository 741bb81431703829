pub mod cli;
pub mod config;
pub mod console;
pub mod filename;
pub mod logging;
pub mod outside;
pub mod result;
pub mod session;
pub mod types;

pub use result::{Error, Result};
pub use session::{Session, SessionObserver, SessionState};
