//! Domain models for the rxmatch system.

mod mapping;
mod reference;
mod resolution;

pub use mapping::*;
pub use reference::*;
pub use resolution::*;
