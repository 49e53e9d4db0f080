//! Controller layer: UI events, user input parsing, and command orchestration.

pub mod events;
pub mod input;
pub mod orchestration;
