pub mod cache;
pub mod document;
pub mod repository;
pub mod supabase;

pub use cache::{FileCache, LocalCache, MemoryCache};
pub use document::{DocumentRef, DocumentStore, InMemoryDocumentStore, SupabaseDocumentStore};
pub use repository::{Committed, DocumentSlice, SessionRepositories, Subscription, SyncContext, SyncedRepository};
