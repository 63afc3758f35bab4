use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::domain::bilty::document::DocumentBiltyStore;
use crate::domain::bilty::relational::RelationalBiltyStore;
use crate::domain::bilty::service::BiltyService;
use crate::domain::bilty::store::BiltyStore;
use crate::domain::initial_setup::repository::InitialSetupRepository;
use crate::domain::initial_setup::service::InitialSetupService;
use crate::domain::user::repository::UserRepository;
use crate::domain::user::service::UserService;
use crate::shared::config::StorageBackend;

/// Everything the handlers need, constructed once at startup around the
/// single database handle. The bilty store implementation is chosen here and
/// nowhere else.
pub struct AppState {
    pub bilty: BiltyService,
    pub users: UserService,
    pub initial_setup: InitialSetupService,
}

impl AppState {
    pub fn new(db: DatabaseConnection, backend: StorageBackend) -> Self {
        let store: Arc<dyn BiltyStore> = match backend {
            StorageBackend::Relational => Arc::new(RelationalBiltyStore::new(db.clone())),
            StorageBackend::Document => Arc::new(DocumentBiltyStore::new(db.clone())),
        };
        Self {
            bilty: BiltyService::new(store),
            users: UserService::new(UserRepository::new(db.clone())),
            initial_setup: InitialSetupService::new(InitialSetupRepository::new(db)),
        }
    }
}
