use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::{AshaWorkerRepository, ChatRepository, MongoDB, PatientRepository, UserRepository};
use crate::services::ai_service::AiClient;
use crate::services::cloudinary_service::{AssetStore, CloudinaryClient};
use crate::services::email_service::{self, EmailSender};
use crate::services::google_service::{GoogleTokenVerifier, IdTokenVerifier};
use crate::utils::AppResult;

/// Shared application state handed to every handler through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub asha_workers: Arc<dyn AshaWorkerRepository>,
    pub patients: Arc<dyn PatientRepository>,
    pub chats: Arc<dyn ChatRepository>,
    pub assets: Arc<dyn AssetStore>,
    pub mailer: Arc<dyn EmailSender>,
    pub google: Arc<dyn IdTokenVerifier>,
    pub ai: Arc<AiClient>,
}

impl AppState {
    pub fn new(config: AppConfig, db: MongoDB) -> AppResult<Self> {
        let db = Arc::new(db);
        let ai = AiClient::new(&config.ai_service_url, config.ai_timeout_secs)?;

        Ok(Self {
            users: db.clone(),
            asha_workers: db.clone(),
            patients: db.clone(),
            chats: db,
            assets: Arc::new(CloudinaryClient::new(config.cloudinary.clone())),
            mailer: Arc::from(email_service::sender_from_config(&config.email)),
            google: Arc::new(GoogleTokenVerifier::new(config.google_client_id.clone())),
            ai: Arc::new(ai),
            config: Arc::new(config),
        })
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::services::cloudinary_service::testing::MockAssetStore;
    use crate::services::email_service::testing::RecordingMailer;
    use crate::services::google_service::testing::StaticVerifier;

    /// State wired to in-memory fakes, with handles kept for assertions.
    pub struct TestContext {
        pub state: AppState,
        pub store: Arc<MemoryStore>,
        pub assets: Arc<MockAssetStore>,
        pub mailer: Arc<RecordingMailer>,
    }

    impl TestContext {
        pub fn new() -> Self {
            let config = AppConfig::for_tests();
            let store = Arc::new(MemoryStore::new());
            let assets = Arc::new(MockAssetStore::default());
            let mailer = Arc::new(RecordingMailer::default());
            let ai = AiClient::new(&config.ai_service_url, config.ai_timeout_secs)
                .expect("AI client builds with test config");

            let state = AppState {
                config: Arc::new(config),
                users: store.clone(),
                asha_workers: store.clone(),
                patients: store.clone(),
                chats: store.clone(),
                assets: assets.clone(),
                mailer: mailer.clone(),
                google: Arc::new(StaticVerifier),
                ai: Arc::new(ai),
            };

            Self {
                state,
                store,
                assets,
                mailer,
            }
        }
    }
}
