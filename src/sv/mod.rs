pub mod admin;
pub mod keygen;
pub mod license;
pub mod server;
pub mod user;

pub use admin::Authority;
pub use license::License;
pub use server::Server;
pub use user::User;
