pub mod asset_api;

pub use asset_api::*;
