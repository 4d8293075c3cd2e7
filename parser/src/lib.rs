pub mod actions;
pub mod analyzer;
pub mod blocks;
mod cursor;
mod error;
pub mod events;
pub mod header;
mod options;
pub mod roster;
pub mod settings;
pub mod types;
mod w3greplay;

pub use cursor::ByteCursor;
pub use error::*;
pub use kinded;
pub use options::*;
pub use strum;
pub use w3greplay::*;
