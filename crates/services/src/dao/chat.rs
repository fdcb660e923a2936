use bizchat_db::{
    DocumentStore,
    models::{Chat, Message},
};
use bson::{doc, oid::ObjectId, DateTime};
use std::sync::Arc;

use super::base::{BaseDao, DaoError, DaoResult};

/// Chats and their messages. Every lookup is keyed by the owning company and
/// user, so a chat that belongs to someone else is simply `NotFound`.
pub struct ChatDao {
    pub base: BaseDao<Chat>,
    pub messages: BaseDao<Message>,
}

impl ChatDao {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            base: BaseDao::new(store.clone(), Chat::COLLECTION),
            messages: BaseDao::new(store, Message::COLLECTION),
        }
    }

    pub async fn create(&self, chat: &Chat) -> DaoResult<Chat> {
        let id = self.base.insert_one(chat).await?;
        self.base.find_by_id(id).await
    }

    pub async fn count_for_user(&self, company_id: ObjectId, user_id: ObjectId) -> DaoResult<u64> {
        self.base
            .count(doc! { "company_id": company_id, "user_id": user_id })
            .await
    }

    pub async fn list_for_user(
        &self,
        company_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Vec<Chat>> {
        self.base
            .find_many(
                doc! { "company_id": company_id, "user_id": user_id, "is_archived": false },
                Some(doc! { "updated_at": -1 }),
            )
            .await
    }

    pub async fn find_owned(
        &self,
        company_id: ObjectId,
        user_id: ObjectId,
        chat_id: ObjectId,
    ) -> DaoResult<Chat> {
        self.base
            .find_one(doc! { "_id": chat_id, "company_id": company_id, "user_id": user_id })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn rename(
        &self,
        company_id: ObjectId,
        user_id: ObjectId,
        chat_id: ObjectId,
        title: &str,
    ) -> DaoResult<Chat> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DaoError::Validation("Title cannot be empty".into()));
        }
        let matched = self
            .base
            .update_one(
                doc! { "_id": chat_id, "company_id": company_id, "user_id": user_id },
                doc! { "$set": { "title": title } },
            )
            .await?;
        if !matched {
            return Err(DaoError::NotFound);
        }
        self.find_owned(company_id, user_id, chat_id).await
    }

    /// Removes the chat and every message in it.
    pub async fn delete(
        &self,
        company_id: ObjectId,
        user_id: ObjectId,
        chat_id: ObjectId,
    ) -> DaoResult<u64> {
        self.find_owned(company_id, user_id, chat_id).await?;
        let removed = self
            .messages
            .hard_delete(doc! { "chat_id": chat_id, "company_id": company_id })
            .await?;
        self.base
            .delete_one(doc! { "_id": chat_id, "company_id": company_id, "user_id": user_id })
            .await?;
        Ok(removed)
    }

    /// Deletes the chat only if it has no messages. Returns whether it was
    /// deleted.
    pub async fn cleanup_if_empty(
        &self,
        company_id: ObjectId,
        user_id: ObjectId,
        chat_id: ObjectId,
    ) -> DaoResult<bool> {
        self.find_owned(company_id, user_id, chat_id).await?;
        if self.count_messages(chat_id).await? > 0 {
            return Ok(false);
        }
        self.base
            .delete_one(doc! { "_id": chat_id, "company_id": company_id, "user_id": user_id })
            .await?;
        Ok(true)
    }

    pub async fn count_messages(&self, chat_id: ObjectId) -> DaoResult<u64> {
        self.messages.count(doc! { "chat_id": chat_id }).await
    }

    /// Oldest first.
    pub async fn messages_for(&self, chat_id: ObjectId) -> DaoResult<Vec<Message>> {
        self.messages
            .find_many(doc! { "chat_id": chat_id }, Some(doc! { "timestamp": 1 }))
            .await
    }

    /// Stores a message and bumps the chat's `updated_at`.
    pub async fn save_message(&self, message: &Message) -> DaoResult<Message> {
        let id = self.messages.insert_one(message).await?;
        self.base
            .update_by_id(message.chat_id, doc! { "$set": { "updated_at": DateTime::now() } })
            .await?;
        let mut saved = message.clone();
        saved.id = Some(id);
        Ok(saved)
    }

    pub async fn set_title(&self, chat_id: ObjectId, title: &str) -> DaoResult<()> {
        self.base
            .update_by_id(chat_id, doc! { "$set": { "title": title } })
            .await?;
        Ok(())
    }

    /// Deletes one message from a chat the caller owns.
    pub async fn delete_message(
        &self,
        company_id: ObjectId,
        user_id: ObjectId,
        message_id: ObjectId,
    ) -> DaoResult<()> {
        let message = self
            .messages
            .find_by_id_in_company(company_id, message_id)
            .await?;
        self.find_owned(company_id, user_id, message.chat_id).await?;
        self.messages
            .delete_one(doc! { "_id": message_id, "company_id": company_id })
            .await?;
        Ok(())
    }
}
