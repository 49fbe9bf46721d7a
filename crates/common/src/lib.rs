//! Common types shared by the Apple sign-in crates

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};
