//! Shared types, error definitions, and collaborator interfaces used across all toolgate crates.

pub mod catalog;
pub mod error;
pub mod memory;
pub mod types;

pub use {
    catalog::{
        BindingStore, CredentialResolver, ProviderRuntime, SharedBindingStore,
        SharedCredentialResolver, SharedProviderRuntime,
    },
    error::{Error, FromMessage, Result},
    memory::InMemoryCatalog,
};
