pub mod arena;
pub mod clock;
pub mod error;
pub mod input;
pub mod motion;
pub mod projectile;
pub mod protocol;
pub mod roster;
pub mod snapshot;
pub mod tcp_transport;
pub mod transport;
