pub mod auth;
pub mod session;

pub use auth::*;
pub use session::*;
