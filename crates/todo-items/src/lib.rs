//! Todo items and the live document store behind them.
//!
//! - [`DocumentStore`] is the backend boundary: single-row writes, a one-shot
//!   read and a live feed of full snapshots.
//! - [`SupabaseDocumentStore`] talks to a PostgREST table and polls for the feed.
//! - [`MemoryDocumentStore`] keeps the table in process.
//! - [`ItemStore`] is what screens use: it validates titles before any write
//!   and turns the feed into callbacks.

mod backend;
mod error;
mod item;
mod memory;
mod store;
mod supabase;

pub use backend::{DocumentStore, FeedEvent};
pub use error::{BackendError, BackendResult, ItemError, ItemResult, WriteOp};
pub use item::{sort_newest_first, Item, ItemId};
pub use memory::MemoryDocumentStore;
pub use store::{ItemStore, ItemSubscription};
pub use supabase::{SupabaseDocumentStore, MAX_TOGGLE_ATTEMPTS};
