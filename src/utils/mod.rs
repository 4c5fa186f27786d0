pub mod identity;

pub use identity::resolve_user_key;
