pub mod card_ledger;
pub mod cards;
pub mod inventory_entries;
pub mod user_stats;

pub use card_ledger as card_ledger_entity;
pub use cards as card_entity;
pub use inventory_entries as inventory_entry_entity;
pub use user_stats as user_stats_entity;

pub use card_ledger::LedgerKind;
pub use cards::{CardRarity, CardType};
pub use inventory_entries::AcquiredVia;
