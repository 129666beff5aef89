//! Small shared utilities that don't belong to any single pipeline stage.

mod sig_down;

pub use sig_down::SigDown;
