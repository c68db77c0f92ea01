//! Concrete airframes supported by the editor

pub mod a10c;
pub mod f16c;

pub use a10c::{A10C, A10CTag};
pub use f16c::{F16C, F16CTag};
