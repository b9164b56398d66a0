pub mod config;
pub mod core;
pub mod events;
pub mod requests;

pub use config::*;
pub use core::*;
pub use events::*;
pub use requests::*;
