//! Data store modules for Supabase integration

pub mod supabase;
pub mod users;

pub use supabase::{StoreError, SupabaseClient};
pub use users::UserStore;
