// Domain layer: budget models and the ports the store and adapters meet at.

pub mod model;
pub mod ports;
