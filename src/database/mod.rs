pub mod asha_workers;
pub mod chats;
#[cfg(test)]
pub mod memory;
pub mod patients;
pub mod users;

pub use asha_workers::AshaWorkerRepository;
pub use chats::ChatRepository;
pub use patients::PatientRepository;
pub use users::UserRepository;

use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;
use std::time::Duration;

pub const USERS: &str = "users";
pub const ASHA_WORKERS: &str = "ashaworkers";
pub const PATIENTS: &str = "patients";
pub const CHATS: &str = "chats";
pub const SECTIONS: &str = "sections";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(Duration::from_secs(300));
        client_options.connect_timeout = Some(Duration::from_secs(5));
        client_options.server_selection_timeout = Some(Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        let db_name = database_name(uri);
        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Unique keys back the uniqueness rules (email, Aadhar, ASHA id); the TTL
    /// index reaps sign-ups whose OTP was never confirmed.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        let unique = || IndexOptions::builder().unique(true).build();

        let indexes: Vec<(&str, IndexModel, &str)> = vec![
            (
                USERS,
                IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build(),
                "users(email) unique",
            ),
            (
                USERS,
                IndexModel::builder()
                    .keys(doc! { "google_id": 1 })
                    .options(IndexOptions::builder().unique(true).sparse(true).build())
                    .build(),
                "users(google_id) unique sparse",
            ),
            (
                USERS,
                IndexModel::builder()
                    .keys(doc! { "verification_expires": 1 })
                    .options(
                        IndexOptions::builder()
                            .expire_after(Duration::from_secs(0))
                            .partial_filter_expression(doc! { "is_verified": false })
                            .build(),
                    )
                    .build(),
                "users(verification_expires) ttl",
            ),
            (
                ASHA_WORKERS,
                IndexModel::builder().keys(doc! { "asha_id": 1 }).options(unique()).build(),
                "ashaworkers(asha_id) unique",
            ),
            (
                ASHA_WORKERS,
                IndexModel::builder().keys(doc! { "user_id": 1 }).options(unique()).build(),
                "ashaworkers(user_id) unique",
            ),
            (
                PATIENTS,
                IndexModel::builder().keys(doc! { "aadhar_number": 1 }).options(unique()).build(),
                "patients(aadhar_number) unique",
            ),
            (
                PATIENTS,
                IndexModel::builder().keys(doc! { "registered_by": 1, "created_at": -1 }).build(),
                "patients(registered_by, created_at)",
            ),
            (
                CHATS,
                IndexModel::builder().keys(doc! { "user_id": 1, "updated_at": -1 }).build(),
                "chats(user_id, updated_at)",
            ),
            (
                SECTIONS,
                IndexModel::builder().keys(doc! { "chat_id": 1, "created_at": 1 }).build(),
                "sections(chat_id, created_at)",
            ),
        ];

        for (collection, index, label) in indexes {
            match self.collection::<Document>(collection).create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}", label),
                Err(e) => log::warn!("   ⚠️  Index {} not created: {}", label, e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub async fn ping(&self) -> bool {
        self.db.run_command(doc! { "ping": 1 }).await.is_ok()
    }
}

/// Database name from the URI path, `asha` when the URI has none.
fn database_name(uri: &str) -> &str {
    let without_scheme = uri.split("://").nth(1).unwrap_or(uri);
    without_scheme
        .split_once('/')
        .map(|(_, rest)| rest.split('?').next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or("asha")
}

/// Escapes regex metacharacters so user search text matches literally.
pub(crate) fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
