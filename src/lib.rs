//! Specchio: prerenders client-side rendered pages through a remote
//! rendering function and caches the HTML until content changes.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
