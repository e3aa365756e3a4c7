pub mod clock;
pub mod config;
pub mod error;
pub mod guide;
pub mod pipeline;
pub mod scheduler;
pub mod trigger;

pub use error::{Result, RoutefinderError};
