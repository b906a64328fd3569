//! HTTP handlers, one module per storefront area.

pub mod analytics;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod content;
pub mod customer;
pub mod marketing;
pub mod notification;
pub mod order;
pub mod seo;
pub mod settings;
pub mod upload;
