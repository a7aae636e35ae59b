//! Provider registry for managing inference backends.

pub mod core;
pub mod routing;

pub use self::core::ProviderRegistry;
