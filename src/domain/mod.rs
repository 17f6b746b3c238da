// Domain layer: models and ports (interfaces). External systems are only
// reached through the port traits so tests can swap in in-memory fakes.

pub mod model;
pub mod ports;
