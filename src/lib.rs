pub mod browser;
pub mod fetch;
mod utils;

pub use browser::{open_url, Launcher, Mechanism, OpenError};
pub use fetch::{fetch, read_url, FetchError, FetchOptions, Fetched};
