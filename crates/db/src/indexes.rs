use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::models::{ActivityLog, Chat, Company, Message, Role, User};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    create_indexes(
        db,
        Company::COLLECTION,
        vec![
            index_unique(bson::doc! { "domain": 1 }),
            index_unique(bson::doc! { "email": 1 }),
        ],
    )
    .await?;

    create_indexes(
        db,
        Role::COLLECTION,
        vec![index_unique(bson::doc! { "company_id": 1, "name": 1 })],
    )
    .await?;

    create_indexes(
        db,
        User::COLLECTION,
        vec![
            index_unique(bson::doc! { "company_id": 1, "email": 1 }),
            index(bson::doc! { "role_id": 1 }),
            index(bson::doc! { "company_id": 1, "is_active": 1 }),
        ],
    )
    .await?;

    create_indexes(
        db,
        ActivityLog::COLLECTION,
        vec![
            index(bson::doc! { "company_id": 1, "timestamp": -1 }),
            index(bson::doc! { "company_id": 1, "user_id": 1, "timestamp": -1 }),
            index(bson::doc! { "company_id": 1, "action": 1 }),
        ],
    )
    .await?;

    create_indexes(
        db,
        Chat::COLLECTION,
        vec![index(
            bson::doc! { "company_id": 1, "user_id": 1, "updated_at": -1 },
        )],
    )
    .await?;

    create_indexes(
        db,
        Message::COLLECTION,
        vec![index(bson::doc! { "chat_id": 1, "timestamp": 1 })],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
