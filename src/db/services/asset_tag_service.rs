use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::db::entities::{asset_tag, machine};
use crate::db::enums::TagStatus;
use crate::db::services::machine_service::{self, MachineInput};
use crate::web::error::{AppError, map_conflict_violation};

// --- Asset Tag Service Functions ---

/// Upper bound on one generation batch; matches what a single print sheet
/// run can use.
pub const MAX_BATCH_SIZE: u32 = 100;

/// Batch size must be in `1..=100`.
pub fn validate_batch_count(count: u32) -> Result<(), AppError> {
    if count == 0 || count > MAX_BATCH_SIZE {
        return Err(AppError::InvalidInput(format!(
            "count must be between 1 and {MAX_BATCH_SIZE}"
        )));
    }
    Ok(())
}

/// Generates a fresh globally-unique tag token.
pub fn new_tag_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Lists tags newest first, with the linked machine (if any) so the
/// dashboard can show what each sticker points at.
pub async fn list_tags(
    db: &DatabaseConnection,
    status: Option<TagStatus>,
) -> Result<Vec<(asset_tag::Model, Option<machine::Model>)>, AppError> {
    let mut query = asset_tag::Entity::find().find_also_related(machine::Entity);
    if let Some(status) = status {
        query = query.filter(asset_tag::Column::Status.eq(status));
    }
    let tags = query
        .order_by_desc(asset_tag::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(tags)
}

/// Creates `count` unlinked tags, each with a fresh token. Tags are
/// generated ahead of physical printing.
pub async fn generate_batch(
    db: &DatabaseConnection,
    count: u32,
) -> Result<Vec<asset_tag::Model>, AppError> {
    validate_batch_count(count)?;

    let now = Utc::now();
    let mut created = Vec::with_capacity(count as usize);
    let txn = db.begin().await?;
    for _ in 0..count {
        let new_tag = asset_tag::ActiveModel {
            token: Set(new_tag_token()),
            status: Set(TagStatus::Unlinked),
            machine_id: Set(None),
            created_at: Set(now),
            linked_at: Set(None),
            ..Default::default()
        };
        created.push(new_tag.insert(&txn).await?);
    }
    txn.commit().await?;
    Ok(created)
}

pub async fn get_by_token(
    db: &DatabaseConnection,
    token: &str,
) -> Result<Option<(asset_tag::Model, Option<machine::Model>)>, AppError> {
    let result = asset_tag::Entity::find()
        .filter(asset_tag::Column::Token.eq(token))
        .find_also_related(machine::Entity)
        .one(db)
        .await?;
    Ok(result)
}

async fn find_by_token_required<C: ConnectionTrait>(
    conn: &C,
    token: &str,
) -> Result<asset_tag::Model, AppError> {
    asset_tag::Entity::find()
        .filter(asset_tag::Column::Token.eq(token))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))
}

async fn link_in_txn<C: ConnectionTrait>(
    conn: &C,
    tag_model: asset_tag::Model,
    machine_id: i32,
) -> Result<asset_tag::Model, AppError> {
    if tag_model.status == TagStatus::Linked {
        return Err(AppError::Conflict("Tag is already linked".to_string()));
    }

    // 1:1 invariant: reject instead of silently stealing the machine from
    // another sticker.
    let existing_tag = asset_tag::Entity::find()
        .filter(asset_tag::Column::MachineId.eq(machine_id))
        .one(conn)
        .await?;
    if existing_tag.is_some() {
        return Err(AppError::Conflict(
            "Machine already has a linked tag".to_string(),
        ));
    }

    let now = Utc::now();
    let mut active_tag: asset_tag::ActiveModel = tag_model.into_active_model();
    active_tag.status = Set(TagStatus::Linked);
    active_tag.machine_id = Set(Some(machine_id));
    active_tag.linked_at = Set(Some(now));

    // The pre-check races with a concurrent link; the unique index on
    // machine_id is the authority, so its violation is the same conflict.
    active_tag
        .update(conn)
        .await
        .map_err(|db_err| map_conflict_violation(db_err, "Machine already has a linked tag"))
}

/// Binds an unlinked tag to a machine. Both sides move in one transaction.
pub async fn link_tag(
    db: &DatabaseConnection,
    token: &str,
    machine_id: i32,
) -> Result<asset_tag::Model, AppError> {
    let txn = db.begin().await?;

    let tag_model = find_by_token_required(&txn, token).await?;
    let machine_model = machine::Entity::find_by_id(machine_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Machine not found".to_string()))?;

    let linked = link_in_txn(&txn, tag_model, machine_model.id).await?;

    // Touch the machine so recently-updated ordering reflects the new bind.
    let mut active_machine: machine::ActiveModel = machine_model.into_active_model();
    active_machine.updated_at = Set(Utc::now());
    active_machine.update(&txn).await?;

    txn.commit().await?;
    Ok(linked)
}

/// Returns a linked tag to the pool. The token stays valid; the physical
/// sticker can be bound again later.
pub async fn unlink_tag(
    db: &DatabaseConnection,
    token: &str,
) -> Result<asset_tag::Model, AppError> {
    let txn = db.begin().await?;

    let tag_model = find_by_token_required(&txn, token).await?;
    if tag_model.status != TagStatus::Linked {
        return Err(AppError::Conflict("Tag is not linked".to_string()));
    }

    let machine_id = tag_model.machine_id;
    let mut active_tag: asset_tag::ActiveModel = tag_model.into_active_model();
    active_tag.status = Set(TagStatus::Unlinked);
    active_tag.machine_id = Set(None);
    active_tag.linked_at = Set(None);
    let unlinked = active_tag.update(&txn).await?;

    if let Some(machine_id) = machine_id {
        if let Some(machine_model) = machine::Entity::find_by_id(machine_id).one(&txn).await? {
            let mut active_machine: machine::ActiveModel = machine_model.into_active_model();
            active_machine.updated_at = Set(Utc::now());
            active_machine.update(&txn).await?;
        }
    }

    txn.commit().await?;
    Ok(unlinked)
}

/// Atomic compound operation: create a machine and bind the tag to it.
/// If either step fails the transaction rolls back, so there is never an
/// orphan machine or a half-linked tag.
pub async fn create_machine_with_tag(
    db: &DatabaseConnection,
    token: &str,
    input: &MachineInput,
) -> Result<(machine::Model, asset_tag::Model), AppError> {
    let txn = db.begin().await?;

    let tag_model = find_by_token_required(&txn, token).await?;
    if tag_model.status == TagStatus::Linked {
        return Err(AppError::Conflict("Tag is already linked".to_string()));
    }

    let machine_model = machine_service::insert_machine(&txn, input).await?;
    let linked = link_in_txn(&txn, tag_model, machine_model.id).await?;

    txn.commit().await?;
    Ok((machine_model, linked))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::MachineStatus;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn tag_fixture(id: i32, status: TagStatus, machine_id: Option<i32>) -> asset_tag::Model {
        asset_tag::Model {
            id,
            token: format!("tag-{id}"),
            status,
            machine_id,
            created_at: Utc::now(),
            linked_at: machine_id.map(|_| Utc::now()),
        }
    }

    fn machine_fixture(id: i32) -> machine::Model {
        machine::Model {
            id,
            machine_id: format!("M{id}"),
            display_name: None,
            serial_number: None,
            manufacturer: None,
            model: None,
            purchase_date: None,
            purchase_price: None,
            rom_version: None,
            software_version: None,
            credentials: None,
            current_location: "warehouse".to_string(),
            store_id: None,
            hub_id: None,
            game_type: None,
            game_title: None,
            status: MachineStatus::default(),
            notes: None,
            qr_token: None,
            qr_generated_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn linking_an_already_linked_tag_is_a_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![tag_fixture(1, TagStatus::Linked, Some(9))]])
            .append_query_results([vec![machine_fixture(7)]])
            .into_connection();

        let err = link_tag(&db, "tag-1", 7).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == "Tag is already linked"));
    }

    #[tokio::test]
    async fn linking_a_machine_that_already_has_a_tag_is_a_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![tag_fixture(1, TagStatus::Unlinked, None)]])
            .append_query_results([vec![machine_fixture(7)]])
            .append_query_results([vec![tag_fixture(2, TagStatus::Linked, Some(7))]])
            .into_connection();

        let err = link_tag(&db, "tag-1", 7).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == "Machine already has a linked tag"));
    }

    #[tokio::test]
    async fn unlinking_an_unlinked_tag_is_a_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![tag_fixture(1, TagStatus::Unlinked, None)]])
            .into_connection();

        let err = unlink_tag(&db, "tag-1").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(msg) if msg == "Tag is not linked"));
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<asset_tag::Model>::new()])
            .into_connection();

        let err = link_tag(&db, "nope", 7).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn batch_count_bounds() {
        assert!(validate_batch_count(0).is_err());
        assert!(validate_batch_count(1).is_ok());
        assert!(validate_batch_count(100).is_ok());
        assert!(validate_batch_count(101).is_err());
    }

    #[test]
    fn batch_rejection_is_a_validation_error() {
        let err = validate_batch_count(101).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn generated_tokens_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..MAX_BATCH_SIZE {
            assert!(seen.insert(new_tag_token()));
        }
    }
}
