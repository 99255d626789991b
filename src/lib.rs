pub mod config;
pub mod error;
pub mod partition;
pub mod serial;
pub mod size;
pub mod source;
pub mod target;
pub mod tool;

pub use error::{FlashError, FlashResult};

#[macro_use]
extern crate log;
