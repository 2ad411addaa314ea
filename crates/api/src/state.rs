use std::sync::Arc;

use ghostline_db::Stores;

use crate::auth::device::DeviceAuthenticator;
use crate::auth::session::{SessionManager, TouchWorker};
use crate::config::ServerConfig;
use crate::trust::TrustService;
use crate::ws::{Hub, TicketStore};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Storage handles, one per capability.
    pub stores: Stores,
    /// Session issuance, touch queue and revocation.
    pub sessions: Arc<SessionManager>,
    /// Device challenge/bootstrap protocol.
    pub devices: Arc<DeviceAuthenticator>,
    /// Link cards and trust handshake.
    pub trust: Arc<TrustService>,
    /// Single-use chat tickets.
    pub tickets: Arc<TicketStore>,
    /// Live chat connections.
    pub hub: Arc<Hub>,
}

impl AppState {
    /// Wire every service onto `stores`.
    ///
    /// The returned [`TouchWorker`] must be spawned for session activity
    /// updates to reach the store.
    pub fn new(config: ServerConfig, stores: Stores) -> (Self, TouchWorker) {
        let (sessions, touch_worker) = SessionManager::new(
            Arc::clone(&stores.sessions),
            config.jwt.clone(),
            config.sessions.max_per_user,
        );
        let sessions = Arc::new(sessions);

        let devices = Arc::new(DeviceAuthenticator::new(
            Arc::clone(&stores.devices),
            Arc::clone(&stores.nonces),
            Arc::clone(&sessions),
            config.anon_hmac_key.clone(),
        ));
        let trust = Arc::new(TrustService::new(Arc::clone(&stores.trust)));

        let state = Self {
            config: Arc::new(config),
            stores,
            sessions,
            devices,
            trust,
            tickets: Arc::new(TicketStore::new()),
            hub: Arc::new(Hub::new()),
        };
        (state, touch_worker)
    }
}
