pub mod env;
pub mod settings;

pub use env::*;
pub use settings::*;
