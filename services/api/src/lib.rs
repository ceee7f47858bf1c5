//! SciScroll API Library Crate
//!
//! Configuration, application state, HTTP handlers and routing for the
//! exploration feed service. The binaries are thin wrappers around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
