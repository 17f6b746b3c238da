// Adapters layer: concrete implementations of the domain ports for
// external systems (hosting provider, payment provider, persistence).

pub mod memory;
pub mod netlify;
pub mod pagarme;
