pub mod runner;
pub mod schedule;

pub use runner::*;
pub use schedule::*;
