//! Core chain types: names, assets, symbols, and timestamps.

mod asset;
mod name;
mod time;

pub use asset::{Asset, Symbol};
pub use name::Name;
pub use time::TimePointSec;
