//! Command implementations for the asinopt CLI

mod history;
mod inspect;
mod misc;
mod optimize;

pub use history::*;
pub use inspect::*;
pub use misc::*;
pub use optimize::*;
