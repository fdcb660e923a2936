use axum::{
    extract::{OriginalUri, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use bizchat_db::models::ActivityLog;
use bizchat_services::{IdentityContext, audit::classify};
use tracing::error;

use crate::{extractors::ClientInfo, state::AppState};

/// Records one audit entry per authenticated request once the response is
/// ready. Runs inside `authenticate`, so anonymous requests are skipped.
///
/// The handler runs on its own task, so a client that hangs up mid-request
/// still leaves an entry behind.
pub async fn record_activity(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(identity) = req.extensions().get::<IdentityContext>().cloned() else {
        return next.run(req).await;
    };
    let method = req.method().as_str().to_string();
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let client = ClientInfo::from_request(req.headers(), req.extensions());
    let audit = state.audit.clone();

    let task = tokio::spawn(async move {
        let response = next.run(req).await;
        let (action, resource) = classify(&method, &path);
        audit.record(
            ActivityLog::new(identity.company_id, Some(identity.user_id), action, resource)
                .with_client(client.ip, client.user_agent)
                .with_request(method, path)
                .with_status(response.status().as_u16()),
        );
        response
    });

    match task.await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "Request task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
