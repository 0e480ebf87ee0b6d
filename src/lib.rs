//! Terminal viewer for memory graphs: a force-directed layout over a
//! uniform spatial grid, drawn into a character canvas and diffed frame to
//! frame.

pub mod app;
pub mod config;
pub mod layout;
pub mod memory;
mod util;
