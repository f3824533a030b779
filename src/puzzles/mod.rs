//! Puzzle state machines, one per physical prop.

pub mod gadget_code;
pub mod missile;
pub mod simon;
pub mod vehicle;
pub mod world_map;
