use bizchat_api::{build_router, state::AppState};
use bizchat_config::Settings;
use bizchat_db::{
    DocumentStore, FindOptions, MemoryStore, MongoStore, connect, ensure_indexes,
    models::ActivityLog,
};
use bson::{Document, doc};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;

use super::completion::ScriptedCompletion;

/// Opts the MongoDB-backed suites in, e.g. `mongodb://localhost:27017`.
pub const MONGO_URL_VAR: &str = "BIZCHAT_TEST_MONGO_URL";

/// A running API server over an in-memory store or a throwaway MongoDB
/// database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub store: Arc<dyn DocumentStore>,
    /// Set for in-memory apps, which allow failure injection.
    pub memory: Option<Arc<MemoryStore>>,
    pub mongo: Option<MongoStore>,
    pub state: AppState,
    pub settings: Settings,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_settings(|_| {}).await
    }

    /// Spawn with `mutator` applied on top of [`Settings::for_tests`].
    pub async fn spawn_with_settings(mutator: impl FnOnce(&mut Settings)) -> Self {
        let mut settings = Settings::for_tests();
        mutator(&mut settings);

        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn DocumentStore> = memory.clone();
        Self::start(settings, store, Some(memory), None).await
    }

    /// Spawn against a real MongoDB with a uniquely named database.
    ///
    /// Returns `None` unless [`MONGO_URL_VAR`] is set, so these suites are
    /// skipped on machines without a database.
    pub async fn spawn_mongo() -> Option<Self> {
        let url = std::env::var(MONGO_URL_VAR).ok()?;
        let mut settings = Settings::for_tests();
        settings.database.url = url;
        settings.database.name = format!("bizchat_test_{}", uuid::Uuid::new_v4().simple());

        let db = connect(&settings).await.expect("Failed to connect to MongoDB");
        ensure_indexes(&db).await.expect("Failed to create indexes");

        let mongo = MongoStore::new(db, Duration::from_secs(settings.database.op_timeout_secs));
        let store: Arc<dyn DocumentStore> = Arc::new(mongo.clone());
        Some(Self::start(settings, store, None, Some(mongo)).await)
    }

    async fn start(
        settings: Settings,
        store: Arc<dyn DocumentStore>,
        memory: Option<Arc<MemoryStore>>,
        mongo: Option<MongoStore>,
    ) -> Self {
        let state = AppState::new(store.clone(), settings.clone(), Arc::new(ScriptedCompletion))
            .expect("Failed to create AppState");
        let app = build_router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().expect("No local address");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server stopped");
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            addr,
            base_url: format!("http://{addr}"),
            store,
            memory,
            mongo,
            state,
            settings,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A client without the shared cookie jar.
    pub fn fresh_client(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    /// The in-memory store; panics for MongoDB-backed apps.
    pub fn memory(&self) -> &MemoryStore {
        self.memory
            .as_deref()
            .expect("Only in-memory test apps support failure injection")
    }

    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        self.store
            .find_many(collection, doc! {}, FindOptions::default())
            .await
            .expect("Failed to read collection")
    }

    pub async fn activity_logs(&self) -> Vec<ActivityLog> {
        self.documents(ActivityLog::COLLECTION)
            .await
            .into_iter()
            .filter_map(|doc| bson::from_document(doc).ok())
            .collect()
    }

    /// Polls the activity collection until `matches` holds.
    pub async fn wait_for_activity(
        &self,
        matches: impl Fn(&[ActivityLog]) -> bool,
    ) -> Vec<ActivityLog> {
        for _ in 0..100 {
            let logs = self.activity_logs().await;
            if matches(&logs) {
                return logs;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let logs = self.activity_logs().await;
        assert!(
            matches(&logs),
            "Expected activity never appeared; have {:?}",
            logs.iter()
                .map(|l| (l.action.as_str(), l.resource.as_str()))
                .collect::<Vec<_>>()
        );
        logs
    }
}
