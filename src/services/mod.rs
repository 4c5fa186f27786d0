pub mod catalog_service;
pub mod craft_service;
pub mod drop_service;
pub mod inventory_service;
pub mod ledger_service;
pub mod stats_service;

pub use catalog_service::*;
pub use craft_service::*;
pub use drop_service::*;
pub use inventory_service::*;
pub use ledger_service::*;
pub use stats_service::*;
