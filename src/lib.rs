//! IntervistAI lets users interview historical characters played by a
//! Gemini model.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`character`] loads the character list and resolves selections.
//! - [`auth`] stores and verifies the API credential.
//! - [`core`] owns the interview session state machine, the history archive,
//!   durable storage, configuration and the provider seam.
//! - [`api`] defines the Gemini wire payloads and the HTTP call.
//! - [`cli`] parses arguments and runs the line-based interview loop.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod auth;
pub mod character;
pub mod cli;
pub mod core;
pub mod utils;
