pub mod error;
pub mod flow;
pub mod loader;
pub mod transform;
