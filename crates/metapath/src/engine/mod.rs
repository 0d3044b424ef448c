pub mod analysis;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod loader;
