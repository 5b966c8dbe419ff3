//! Cart domain: value objects, the cart aggregate, resolution policy,
//! events and the ports the services depend on.

pub mod aggregates;
pub mod events;
pub mod ports;
pub mod resolver;
pub mod value_objects;
