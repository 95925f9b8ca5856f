// Domain layer: document models and ports (storage, config, geocoder).

pub mod model;
pub mod ports;
