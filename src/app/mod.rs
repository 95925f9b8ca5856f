// Application layer: wires storage, config and geocoders into the services.

pub mod backend;

pub use backend::Backend;
