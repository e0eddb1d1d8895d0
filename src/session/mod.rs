//! Console-side session handling: who is signed in and which tenant they act
//! on.
//!
//! - `store`: key/value persistence backends
//! - `cache`: typed keys over a store
//! - `provider`: auth and directory seams, `supabase`: their HTTP implementation
//! - `context`: session bootstrap and auth state
//! - `tenant`: tenant selection

pub mod cache;
pub mod context;
pub mod provider;
pub mod store;
pub mod supabase;
pub mod tenant;
pub mod types;

pub use cache::SessionCache;
pub use context::{AuthContext, AuthSettings, AuthState};
pub use provider::{AuthError, AuthEvent, AuthProvider, Directory};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use supabase::{SupabaseClient, SupabaseConfig};
pub use tenant::{TenantChange, TenantScope};
pub use types::{AuthUser, Cliente, Profile, Role, Session};
