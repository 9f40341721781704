//! Rotating photo-gallery camera fed by activity image URLs.
//!
//! Image references arrive on an event bus, are validated and merged into a
//! bounded, date-ordered gallery that is persisted on every update, and a timer
//! rotates which image the camera entity shows.

pub mod cache;
pub mod config;
pub mod entity;
pub mod errors;
pub mod events;
pub mod fetcher;
pub mod gallery;
pub mod scheduler;
pub mod web;
