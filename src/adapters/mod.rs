// Adapters layer: concrete implementations for external systems.

pub mod documents;
pub mod http;
pub mod memory;
