use bizchat_db::models::{Attachment, Chat, Message, MessageRole};
use bson::{DateTime, oid::ObjectId};
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use tracing::{debug, warn};

use crate::{
    auth::IdentityContext,
    completion::{CompletionService, ConversationTurn},
    dao::{ChatDao, CompanyDao, DaoError},
    error::ServiceResult,
};

const DEFAULT_DOCUMENT_PROMPT: &str = "Summarize this document and list its key points.";

/// One user message and the assistant's answer to it.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub user_message: Message,
    pub assistant_message: Message,
}

#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub prompt: Option<String>,
}

pub struct ChatService {
    chats: Arc<ChatDao>,
    companies: Arc<CompanyDao>,
    completion: Arc<dyn CompletionService>,
}

impl ChatService {
    pub fn new(
        chats: Arc<ChatDao>,
        companies: Arc<CompanyDao>,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            chats,
            companies,
            completion,
        }
    }

    pub async fn create_chat(
        &self,
        identity: &IdentityContext,
        title: Option<String>,
    ) -> ServiceResult<Chat> {
        let company = self.companies.find_by_id(identity.company_id).await?;
        let existing = self
            .chats
            .count_for_user(identity.company_id, identity.user_id)
            .await?;
        if existing >= u64::from(company.settings.max_chats_per_user) {
            return Err(DaoError::Validation(format!(
                "Chat limit of {} reached",
                company.settings.max_chats_per_user
            ))
            .into());
        }
        let chat = Chat::new(identity.company_id, identity.user_id, title);
        Ok(self.chats.create(&chat).await?)
    }

    pub async fn send_message(
        &self,
        identity: &IdentityContext,
        chat_id: ObjectId,
        content: &str,
    ) -> ServiceResult<Exchange> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DaoError::Validation("Message cannot be empty".into()).into());
        }
        let chat = self
            .chats
            .find_owned(identity.company_id, identity.user_id, chat_id)
            .await?;
        let history = self.admit_message(identity.company_id, chat_id).await?;
        if history.is_empty() && chat.title == Chat::DEFAULT_TITLE {
            self.chats
                .set_title(chat_id, &Chat::title_from_message(content))
                .await?;
        }

        let user_message = self
            .chats
            .save_message(&Message::new(
                chat_id,
                identity.company_id,
                MessageRole::User,
                content.to_string(),
            ))
            .await?;

        let turns: Vec<ConversationTurn> = history
            .into_iter()
            .map(|m| ConversationTurn {
                role: m.role,
                content: m.content,
            })
            .collect();
        let started = Instant::now();
        let reply = self
            .completion
            .generate_reply(&turns, content)
            .await
            .inspect_err(|e| warn!(%chat_id, error = %e, "Assistant reply failed"))?;

        let assistant_message = self
            .save_reply(identity.company_id, chat_id, reply, started)
            .await?;
        Ok(Exchange {
            user_message,
            assistant_message,
        })
    }

    /// Runs a document through the assistant under the company's upload policy.
    pub async fn process_document(
        &self,
        identity: &IdentityContext,
        chat_id: ObjectId,
        upload: DocumentUpload,
    ) -> ServiceResult<Exchange> {
        let company = self.companies.find_by_id(identity.company_id).await?;
        if !company.settings.enable_document_upload {
            return Err(
                DaoError::Forbidden("Document upload is disabled for this company".into()).into(),
            );
        }
        let size = upload.bytes.len() as u64;
        if size == 0 {
            return Err(DaoError::Validation("Document is empty".into()).into());
        }
        if size > company.settings.max_document_size {
            return Err(DaoError::Validation(format!(
                "Document exceeds the {} byte limit",
                company.settings.max_document_size
            ))
            .into());
        }

        self.chats
            .find_owned(identity.company_id, identity.user_id, chat_id)
            .await?;
        self.admit_message(identity.company_id, chat_id).await?;

        let prompt = upload
            .prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_DOCUMENT_PROMPT.to_string());

        let started = Instant::now();
        let reply = self
            .completion
            .process_document(&upload.bytes, &upload.mime_type, &prompt)
            .await?;

        let mut message = Message::new(
            chat_id,
            identity.company_id,
            MessageRole::User,
            prompt,
        );
        message.attachments.push(Attachment {
            filename: upload.filename,
            mime_type: upload.mime_type,
            size,
            processed_text: Some(reply.clone()),
            uploaded_at: DateTime::now(),
        });
        let user_message = self.chats.save_message(&message).await?;
        let assistant_message = self
            .save_reply(identity.company_id, chat_id, reply, started)
            .await?;
        Ok(Exchange {
            user_message,
            assistant_message,
        })
    }

    /// Checks the per-chat message cap and returns the current history.
    async fn admit_message(
        &self,
        company_id: ObjectId,
        chat_id: ObjectId,
    ) -> ServiceResult<Vec<Message>> {
        let company = self.companies.find_by_id(company_id).await?;
        let history = self.chats.messages_for(chat_id).await?;
        if history.len() as u64 >= u64::from(company.settings.max_messages_per_chat) {
            return Err(DaoError::Validation(format!(
                "Message limit of {} reached for this chat",
                company.settings.max_messages_per_chat
            ))
            .into());
        }
        Ok(history)
    }

    async fn save_reply(
        &self,
        company_id: ObjectId,
        chat_id: ObjectId,
        reply: String,
        started: Instant,
    ) -> ServiceResult<Message> {
        let mut message = Message::new(chat_id, company_id, MessageRole::Assistant, reply);
        message.model_used = Some(self.completion.model_name().to_string());
        message.response_time = Some(started.elapsed().as_secs_f64());
        debug!(%chat_id, response_time = ?message.response_time, "Assistant replied");
        Ok(self.chats.save_message(&message).await?)
    }
}
