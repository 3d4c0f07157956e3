//! Remote store access for ScopePilot.
//!
//! All durable state (estimates, quotes, agreements, versions, notes) lives
//! in a Supabase project reached through its PostgREST API.

pub mod client;
pub mod in_memory;
pub mod supabase;

pub use client::{COPILOT_AUTHOR, NewAgreement, RemoteStore, tables};
pub use in_memory::InMemoryBackend;
pub use supabase::SupabaseBackend;
