use bson::{Document, doc, oid::ObjectId};
use mongodb::{Collection, Database};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaoError {
    #[error("Resource not found")]
    NotFound,
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Validation: {0}")]
    Validation(String),
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
    #[error(transparent)]
    BsonSer(#[from] bson::ser::Error),
    #[error(transparent)]
    BsonDe(#[from] bson::de::Error),
}

pub type DaoResult<T> = Result<T, DaoError>;

/// Generic data access over one collection. Model types carry their own
/// `COLLECTION` const; soft deletion is a `deleted_at` timestamp every
/// read filters on.
pub struct BaseDao<T: Send + Sync> {
    collection: Collection<T>,
}

impl<T> BaseDao<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(db: &Database, collection: &str) -> Self {
        Self {
            collection: db.collection(collection),
        }
    }

    pub fn collection(&self) -> &Collection<T> {
        &self.collection
    }

    pub async fn insert_one(&self, doc: &T) -> DaoResult<ObjectId> {
        match self.collection.insert_one(doc).await {
            Ok(result) => result
                .inserted_id
                .as_object_id()
                .ok_or_else(|| DaoError::Validation("Inserted id is not an ObjectId".to_string())),
            Err(e) => Err(classify_write_error(e)),
        }
    }

    pub async fn find_one(&self, filter: Document) -> DaoResult<Option<T>> {
        Ok(self.collection.find_one(filter).await?)
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DaoResult<T> {
        self.find_one(doc! { "_id": id, "deleted_at": null })
            .await?
            .ok_or(DaoError::NotFound)
    }

    /// Owner-scoped lookup: an id supplied by a caller must belong to that
    /// caller's clinician, never resolve across tenants.
    pub async fn find_by_id_for_clinician(
        &self,
        clinician_id: ObjectId,
        id: ObjectId,
    ) -> DaoResult<T> {
        self.find_one(doc! {
            "_id": id,
            "clinician_id": clinician_id,
            "deleted_at": null,
        })
        .await?
        .ok_or(DaoError::NotFound)
    }
}

fn classify_write_error(e: mongodb::error::Error) -> DaoError {
    if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(we)) = &*e.kind
    {
        if we.code == 11000 {
            return DaoError::DuplicateKey(we.message.clone());
        }
    }
    DaoError::Mongo(e)
}
