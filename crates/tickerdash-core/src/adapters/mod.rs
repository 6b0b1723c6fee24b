//! Market-data source adapters.

mod synthetic;
mod yahoo;

pub use yahoo::{YahooAdapter, YahooAuthManager};
