use bizchat_config::Settings;
use bizchat_db::DocumentStore;
use bizchat_services::{
    AuditPipeline, AuthError, AuthService, ChatService, CompletionService, SessionService,
    TenantRegistry,
    dao::{ActivityLogDao, ChatDao, CompanyDao, RoleDao, UserDao},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub auth: Arc<AuthService>,
    pub companies: Arc<CompanyDao>,
    pub roles: Arc<RoleDao>,
    pub users: Arc<UserDao>,
    pub activity_logs: Arc<ActivityLogDao>,
    pub chats: Arc<ChatDao>,
    pub registry: Arc<TenantRegistry>,
    pub sessions: Arc<SessionService>,
    pub chat: Arc<ChatService>,
    pub completion: Arc<dyn CompletionService>,
    pub audit: AuditPipeline,
}

impl AppState {
    /// Wires every service over `store`. Must run inside a Tokio runtime:
    /// the audit consumer task is spawned here.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        settings: Settings,
        completion: Arc<dyn CompletionService>,
    ) -> Result<Self, AuthError> {
        let auth = Arc::new(AuthService::new(&settings.jwt, &settings.password)?);
        let companies = Arc::new(CompanyDao::new(store.clone()));
        let roles = Arc::new(RoleDao::new(store.clone()));
        let users = Arc::new(UserDao::new(store.clone()));
        let activity_logs = Arc::new(ActivityLogDao::new(store.clone()));
        let chats = Arc::new(ChatDao::new(store));

        let (audit, _consumer) =
            AuditPipeline::start(activity_logs.clone(), settings.audit.queue_capacity);

        let registry = Arc::new(TenantRegistry::new(
            companies.clone(),
            roles.clone(),
            users.clone(),
            auth.clone(),
        ));
        let sessions = Arc::new(SessionService::new(
            companies.clone(),
            users.clone(),
            auth.clone(),
            audit.clone(),
        ));
        let chat = Arc::new(ChatService::new(
            chats.clone(),
            companies.clone(),
            completion.clone(),
        ));

        Ok(Self {
            settings: Arc::new(settings),
            auth,
            companies,
            roles,
            users,
            activity_logs,
            chats,
            registry,
            sessions,
            chat,
            completion,
            audit,
        })
    }
}
