//! Journi, a travel companion built from a team of agents.
//!
//! A coordinator agent breaks travel questions down and delegates them to
//! specialists for web research, language and culture, logistics, and
//! recommendations. Each specialist calls travel tools that answer from
//! built-in tables and upgrade to live services when API keys are set.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library, driving a [`Session`] from your own chat UI.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod chat;
mod config;
pub mod image;
pub mod search;
mod session;
pub mod team;
pub mod tools;

pub use config::{Config, ModelSettings};
pub use session::{Session, SessionBuilder};

/// Re-exports of [`journi_core`] crate.
pub mod core {
    pub use journi_core::*;
}
