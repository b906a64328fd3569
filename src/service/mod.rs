//! Data-access and domain services. Handlers stay thin and call into these.

pub mod analytics;
pub mod auth;
pub mod cart;
pub mod category;
pub mod content;
pub mod customer;
pub mod mail;
pub mod marketing;
pub mod notification;
pub mod order;
pub mod patch;
pub mod prebuilt;
pub mod product;
pub mod seo;
pub mod settings;
pub mod tag;
pub mod upload;
pub mod validation;
