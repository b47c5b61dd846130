//! Controller layer: UI events, submission state machine, and command orchestration.

pub mod events;
pub mod form;
pub mod orchestration;
pub mod reducer;
