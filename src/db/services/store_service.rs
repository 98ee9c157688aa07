use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait, prelude::Expr,
};
use serde::Deserialize;

use crate::db::entities::{machine, store};
use crate::web::error::{AppError, map_unique_violation};

// --- Store Service Functions ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInput {
    pub store_id: String,
    pub name: String,
    pub address: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub access_notes: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreUpdate {
    pub store_id: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub access_notes: Option<String>,
    pub notes: Option<String>,
}

pub async fn list_stores(db: &DatabaseConnection) -> Result<Vec<store::Model>, AppError> {
    let stores = store::Entity::find()
        .order_by_desc(store::Column::UpdatedAt)
        .all(db)
        .await?;
    Ok(stores)
}

pub async fn get_store(db: &DatabaseConnection, id: i32) -> Result<Option<store::Model>, AppError> {
    Ok(store::Entity::find_by_id(id).one(db).await?)
}

/// Read-time join: the store merged with every machine currently assigned
/// to it.
pub async fn get_store_with_machines(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<(store::Model, Vec<machine::Model>)>, AppError> {
    let store_model = match store::Entity::find_by_id(id).one(db).await? {
        Some(s) => s,
        None => return Ok(None),
    };
    let machines = machine::Entity::find()
        .filter(machine::Column::StoreId.eq(id))
        .order_by_desc(machine::Column::UpdatedAt)
        .all(db)
        .await?;
    Ok(Some((store_model, machines)))
}

pub async fn create_store(
    db: &DatabaseConnection,
    input: &StoreInput,
) -> Result<store::Model, AppError> {
    if input.store_id.trim().is_empty() {
        return Err(AppError::InvalidInput("storeId is required".to_string()));
    }
    if input.name.trim().is_empty() {
        return Err(AppError::InvalidInput("name is required".to_string()));
    }

    let existing = store::Entity::find()
        .filter(store::Column::StoreId.eq(&input.store_id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(AppError::DuplicateId("Store ID already exists".to_string()));
    }

    let now = Utc::now();
    let new_store = store::ActiveModel {
        store_id: Set(input.store_id.clone()),
        name: Set(input.name.clone()),
        address: Set(input.address.clone()),
        contact_name: Set(input.contact_name.clone()),
        contact_phone: Set(input.contact_phone.clone()),
        contact_email: Set(input.contact_email.clone()),
        access_notes: Set(input.access_notes.clone()),
        notes: Set(input.notes.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    new_store
        .insert(db)
        .await
        .map_err(|db_err| map_unique_violation(db_err, "Store ID already exists"))
}

pub async fn update_store(
    db: &DatabaseConnection,
    id: i32,
    update: &StoreUpdate,
) -> Result<store::Model, AppError> {
    let store_model = store::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Store not found".to_string()))?;

    let mut active: store::ActiveModel = store_model.into_active_model();
    if let Some(store_id) = &update.store_id {
        if store_id.trim().is_empty() {
            return Err(AppError::InvalidInput("storeId cannot be empty".to_string()));
        }
        active.store_id = Set(store_id.clone());
    }
    if let Some(name) = &update.name {
        active.name = Set(name.clone());
    }
    if let Some(address) = &update.address {
        active.address = Set(Some(address.clone()));
    }
    if let Some(contact_name) = &update.contact_name {
        active.contact_name = Set(Some(contact_name.clone()));
    }
    if let Some(contact_phone) = &update.contact_phone {
        active.contact_phone = Set(Some(contact_phone.clone()));
    }
    if let Some(contact_email) = &update.contact_email {
        active.contact_email = Set(Some(contact_email.clone()));
    }
    if let Some(access_notes) = &update.access_notes {
        active.access_notes = Set(Some(access_notes.clone()));
    }
    if let Some(notes) = &update.notes {
        active.notes = Set(Some(notes.clone()));
    }
    active.updated_at = Set(Utc::now());

    active
        .update(db)
        .await
        .map_err(|db_err| map_unique_violation(db_err, "Store ID already exists"))
}

/// Deletes a store and unassigns its machines in one transaction, so no
/// machine is ever left pointing at a deleted store. Unassigned machines
/// fall back to the warehouse location.
pub async fn delete_store(db: &DatabaseConnection, id: i32) -> Result<(), AppError> {
    let store_model = store::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Store not found".to_string()))?;

    let txn = db.begin().await?;

    machine::Entity::update_many()
        .col_expr(machine::Column::StoreId, Expr::value(Option::<i32>::None))
        .col_expr(machine::Column::CurrentLocation, Expr::value("warehouse"))
        .col_expr(machine::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(machine::Column::StoreId.eq(id))
        .exec(&txn)
        .await?;

    store_model.delete(&txn).await?;
    txn.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn store_fixture(id: i32) -> store::Model {
        let now = Utc::now();
        store::Model {
            id,
            store_id: format!("S{id}"),
            name: "Main St".to_string(),
            address: None,
            contact_name: None,
            contact_phone: None,
            contact_email: None,
            access_notes: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn input(store_id: &str, name: &str) -> StoreInput {
        StoreInput {
            store_id: store_id.to_string(),
            name: name.to_string(),
            address: None,
            contact_name: None,
            contact_phone: None,
            contact_email: None,
            access_notes: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn duplicate_store_id_is_rejected_before_insert() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![store_fixture(1)]])
            .into_connection();

        let err = create_store(&db, &input("S1", "Main St")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateId(msg) if msg == "Store ID already exists"));
    }

    #[tokio::test]
    async fn store_delete_unassigns_machines_before_deleting() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![store_fixture(1)]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        delete_store(&db, 1).await.unwrap();

        // machines are moved back to the warehouse first, inside the same
        // transaction that removes the store
        let log = format!("{:?}", db.into_transaction_log());
        let unassign = log.find(r#"UPDATE \"machines\""#).unwrap();
        let delete = log.find(r#"DELETE FROM \"stores\""#).unwrap();
        assert!(unassign < delete);
    }

    #[tokio::test]
    async fn deleting_a_missing_store_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<store::Model>::new()])
            .into_connection();

        let err = delete_store(&db, 42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn store_input_deserializes_camel_case() {
        let input: StoreInput = serde_json::from_str(
            r#"{"storeId":"S1","name":"Main St","contactPhone":"555-0101"}"#,
        )
        .unwrap();
        assert_eq!(input.store_id, "S1");
        assert_eq!(input.name, "Main St");
        assert_eq!(input.contact_phone.as_deref(), Some("555-0101"));
        assert!(input.address.is_none());

        // name is required on the wire
        assert!(serde_json::from_str::<StoreInput>(r#"{"storeId":"S2"}"#).is_err());
    }
}
