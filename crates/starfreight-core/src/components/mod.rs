//! ECS components for the galaxy world

mod fleet;
mod space;

pub use fleet::*;
pub use space::*;
