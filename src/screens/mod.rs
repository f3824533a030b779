//! Passive display screens.
//!
//! Screens share the prop runtime but have no puzzle to solve: the Room
//! Controller drives them with clip and mode commands, and `forceSolve` is
//! accepted as a no-op. A screen is never "inactive", so a mock client's
//! `ready` never auto-plays anything.

pub mod immersion;
pub mod right;
pub mod villain;
