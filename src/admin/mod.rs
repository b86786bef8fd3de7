pub mod handlers;
pub mod reports;

pub use handlers::*;
pub use reports::*;
