#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod scoring;
pub mod time;

pub use error::{Error, IntegrityError};
pub use scoring::score;
pub use time::Clock;
