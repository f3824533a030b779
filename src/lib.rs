//! Escape-room prop controllers.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each prop runs as its own process: a puzzle (or display screen) state
//! machine owned by a single actor task, a WebSocket hub for display and
//! game-master clients, and an optional bridge to the Room Controller.
//! The binaries under `src/bin/` wire one prop each.

pub mod app;
pub mod bridge;
pub mod config;
pub mod frame;
pub mod hardware;
pub mod hub;
pub mod prop;
pub mod puzzles;
pub mod routes;
pub mod runtime;
pub mod screens;
pub mod timer;
