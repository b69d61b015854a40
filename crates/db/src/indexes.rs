use mongodb::{Database, IndexModel};
use tracing::info;

/// Creates the indexes every deployment needs. Idempotent; run at startup.
///
/// Note there is deliberately no unique index on `patients.name`: the
/// pipeline may lazily create patients from noisy extracted names, and
/// duplicate names are resolved by clinicians, not the store.
pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    create_indexes(
        db,
        "patients",
        vec![
            index(bson::doc! { "clinician_id": 1, "name": 1 }),
            index(bson::doc! { "clinician_id": 1, "created_at": -1 }),
        ],
    )
    .await?;

    create_indexes(
        db,
        "encounters",
        vec![
            index(bson::doc! { "patient_id": 1, "created_at": -1 }),
            index(bson::doc! { "clinician_id": 1, "status": 1 }),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    let coll = db.collection::<bson::Document>(collection);
    coll.create_indexes(indexes).await?;
    info!(collection, "Indexes created");
    Ok(())
}
