#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod registry;
pub mod time;

pub use error::Error;
pub use time::Clock;
