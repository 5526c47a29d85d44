//! Multi-party timing coordination for tutoring sessions.
//!
//! A teacher offers an ordered list of windows, each enrolled student
//! offers their own, and the [`engine::Coordinator`] picks the window that
//! accommodates the most students. Every roster or availability change
//! re-runs the whole computation against the session snapshot.

pub mod clock;
pub mod compromise;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod normalize;
pub mod overlap;
pub mod server;
pub mod store;
pub mod time;
