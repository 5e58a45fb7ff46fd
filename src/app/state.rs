//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{MatchConfig, MatchHandle, MatchRegistry};
use crate::store::{SupabaseClient, UserStore};
use crate::util::time::{Clock, SystemClock};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub user_store: UserStore,
    pub match_registry: Arc<MatchRegistry>,
    /// The match every new connection joins
    pub lobby: MatchHandle,
}

impl AppState {
    /// Must be called inside a tokio runtime: the lobby match starts immediately
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Initialize Supabase client
        let supabase = SupabaseClient::new(&config);
        let user_store = UserStore::new(supabase);

        // Initialize match registry and the lobby match
        let match_registry = Arc::new(MatchRegistry::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let lobby = match_registry.launch(
            MatchConfig {
                abandon_grace_ticks: config.abandon_grace_ticks,
                ..MatchConfig::default()
            },
            clock,
        );

        Self {
            config,
            user_store,
            match_registry,
            lobby,
        }
    }
}
