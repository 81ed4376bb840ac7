// Domain layer: run states, command descriptions and the ports the runner depends on.

pub mod model;
pub mod ports;
