//! Request handlers.

pub mod clips;
pub mod health;
pub mod process;

pub use clips::*;
pub use health::*;
pub use process::*;
