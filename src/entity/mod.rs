//! SeaORM entity definitions

pub mod license;
pub mod retired_key;
pub mod server;
pub mod user;
