//! HTTP proxy in front of the export backend: relays job requests, validates
//! create input and cleans up download headers.

pub mod app;
pub mod config;
pub mod middleware;
