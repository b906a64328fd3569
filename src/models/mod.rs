//! Row types and API shapes for storefront entities.

pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod content;
pub mod enums;
pub mod marketing;
pub mod notification;
pub mod order;
pub mod user;

pub use analytics::*;
pub use cart::*;
pub use catalog::*;
pub use content::*;
pub use enums::*;
pub use marketing::*;
pub use notification::*;
pub use order::*;
pub use user::*;
