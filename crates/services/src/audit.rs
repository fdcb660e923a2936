//! Best-effort activity recording.
//!
//! Entries go through a bounded queue to a single consumer task that writes
//! them to the store. Recording never blocks or fails the caller: a full
//! queue sheds the entry and a failed write is logged and dropped.

use bizchat_db::models::{
    ActivityLog,
    activity_log::{actions, resources},
};
use bson::DateTime;
use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, warn};

use crate::dao::ActivityLogDao;

#[derive(Clone)]
pub struct AuditPipeline {
    sender: mpsc::Sender<ActivityLog>,
    clock: Arc<MonotonicClock>,
}

impl AuditPipeline {
    /// Spawns the consumer task on the current runtime.
    pub fn start(logs: Arc<ActivityLogDao>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<ActivityLog>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(entry) = receiver.recv().await {
                if let Err(e) = logs.insert(&entry).await {
                    error!(
                        error = %e,
                        company_id = %entry.company_id,
                        action = %entry.action,
                        "Failed to write activity log; entry dropped"
                    );
                }
            }
            debug!("Audit consumer stopped");
        });

        let pipeline = Self {
            sender,
            clock: Arc::new(MonotonicClock::default()),
        };
        (pipeline, handle)
    }

    /// Queues `entry` without waiting.
    pub fn record(&self, mut entry: ActivityLog) {
        entry.timestamp = self.clock.now();
        match self.sender.try_send(entry) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(entry)) => {
                warn!(
                    company_id = %entry.company_id,
                    action = %entry.action,
                    "Audit queue full; activity log dropped"
                );
            }
            Err(mpsc::error::TrySendError::Closed(entry)) => {
                warn!(
                    company_id = %entry.company_id,
                    action = %entry.action,
                    "Audit consumer is gone; activity log dropped"
                );
            }
        }
    }
}

/// Millisecond timestamps that never go backwards within the process.
#[derive(Debug, Default)]
struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    fn now(&self) -> DateTime {
        let wall = DateTime::now().timestamp_millis();
        let previous = self.last.fetch_max(wall, Ordering::SeqCst);
        DateTime::from_millis(previous.max(wall))
    }
}

/// Maps an HTTP method and path onto the action/resource taxonomy.
pub fn classify(method: &str, path: &str) -> (&'static str, &'static str) {
    (action_for(method, path), resource_for(path))
}

fn action_for(method: &str, path: &str) -> &'static str {
    if path.ends_with("/auth/login") {
        return actions::LOGIN;
    }
    if path.ends_with("/auth/logout") {
        return actions::LOGOUT;
    }
    let has = |segment: &str| path.contains(segment);

    match method {
        "POST" => {
            if has("/messages") {
                actions::SEND_MESSAGE
            } else if has("/documents") {
                actions::UPLOAD_DOCUMENT
            } else if has("/chats") && !has("/cleanup") {
                actions::CREATE_CHAT
            } else if has("/users") {
                actions::CREATE_USER
            } else if has("/roles") {
                actions::CREATE_ROLE
            } else if has("/companies") {
                actions::CREATE_COMPANY
            } else {
                actions::CREATE
            }
        }
        "PUT" | "PATCH" => {
            if has("/settings") {
                actions::UPDATE_SETTINGS
            } else if has("/roles") {
                actions::UPDATE_ROLE
            } else if has("/users") {
                actions::UPDATE_USER
            } else if has("/companies") {
                actions::UPDATE_COMPANY
            } else {
                actions::UPDATE
            }
        }
        "DELETE" => {
            if has("/messages") {
                actions::DELETE
            } else if has("/chats") {
                actions::DELETE_CHAT
            } else if has("/users") {
                actions::DEACTIVATE_USER
            } else if has("/roles") {
                actions::DELETE_ROLE
            } else {
                actions::DELETE
            }
        }
        "GET" => {
            if has("/activity-logs") {
                actions::VIEW_ACTIVITY_LOGS
            } else if has("/analytics") {
                actions::VIEW_ANALYTICS
            } else {
                actions::VIEW
            }
        }
        _ => actions::UNKNOWN,
    }
}

fn resource_for(path: &str) -> &'static str {
    const TABLE: [(&str, &str); 10] = [
        ("/messages", resources::MESSAGE),
        ("/documents", resources::DOCUMENT),
        ("/chats", resources::CHAT),
        ("/roles", resources::ROLE),
        ("/users", resources::USER),
        ("/companies", resources::COMPANY),
        ("/settings", resources::SETTINGS),
        ("/activity-logs", resources::ACTIVITY),
        ("/analytics", resources::ACTIVITY),
        ("/auth/", resources::USER),
    ];
    TABLE
        .iter()
        .find(|(segment, _)| path.contains(segment))
        .map(|(_, resource)| *resource)
        .unwrap_or(resources::UNKNOWN)
}
