pub mod candidate;
pub mod stage;
pub mod transition;
