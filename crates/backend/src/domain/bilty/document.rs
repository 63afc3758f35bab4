use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contracts::domain::bilty::aggregate::{Bilty, BiltyStatus};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    DatabaseTransaction, EntityTrait, Statement, TransactionTrait,
};

use super::store::{BiltyFilter, BiltyStore};
use crate::domain::company::repository as companies;
use crate::domain::user::repository as users;
use crate::error::{StoreError, StoreResult};

pub(crate) mod bilty_doc {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "bilty_doc")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub bilty_no: i64,
        pub created_by: i64,
        pub status: String,
        pub created_at: DateTimeUtc,
        pub updated_at: Option<DateTimeUtc>,
        pub body: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Parameterized fragment for one whitelisted filter field. Scalar columns
/// are queried directly; everything else goes through a fixed json path into
/// the document body. Values always bind as placeholders.
fn fragment_for(field: &str) -> Option<&'static str> {
    match field {
        "id" => Some("id = ?"),
        "bilty_no" => Some("bilty_no = ?"),
        "status" => Some("status = ?"),
        "created_by" => Some("created_by = ?"),
        "from_location" => Some("json_extract(body, '$.from_location') = ?"),
        "to_location" => Some("json_extract(body, '$.to_location') = ?"),
        "consignor_company_id" => Some("json_extract(body, '$.consignor_company_id') = ?"),
        "consignee_company_id" => Some("json_extract(body, '$.consignee_company_id') = ?"),
        _ => None,
    }
}

/// Document-oriented implementation of the note engine. Each note is one row
/// embedding the whole aggregate (goods, address snapshots, resolved
/// companies and creator), so updates rewrite the document wholesale and
/// orphan reclamation has nothing to do. Companies still live in the shared
/// reference table to keep tax-id dedup identical across backends.
pub struct DocumentBiltyStore {
    db: DatabaseConnection,
}

impl DocumentBiltyStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BiltyStore for DocumentBiltyStore {
    async fn create_or_update(&self, mut note: Bilty) -> StoreResult<Bilty> {
        let created_by = note.resolved_created_by();
        if created_by == 0 {
            return Err(StoreError::Validation("created_by cannot be empty".to_string()));
        }
        note.created_by = created_by;

        let txn = self.db.begin().await?;

        // On update the stored row wins for everything storage owns, the
        // creator included, so load it before references get embedded.
        let existing = match note.id {
            Some(id) => {
                let row = bilty_doc::Entity::find_by_id(id)
                    .one(&txn)
                    .await?
                    .ok_or(StoreError::NotFound)?;
                note.bilty_no = row.bilty_no;
                note.created_at = Some(row.created_at);
                note.created_by = row.created_by;
                if let Ok(stored) = serde_json::from_str::<Bilty>(&row.body) {
                    note.pdf_path = stored.pdf_path;
                    note.pdf_created_at = stored.pdf_created_at;
                }
                Some(row)
            }
            None => None,
        };

        embed_references(&txn, &mut note).await?;

        match existing {
            None => {
                let created_at = note.created_at.unwrap_or_else(Utc::now);
                note.created_at = Some(created_at);
                note.updated_at = None;
                note.pdf_path = None;
                note.pdf_created_at = None;
                note.bilty_no = next_bilty_no(&txn).await?;

                let inserted = bilty_doc::ActiveModel {
                    bilty_no: Set(note.bilty_no),
                    created_by: Set(note.created_by),
                    status: Set(note.status.as_str().to_string()),
                    created_at: Set(created_at),
                    updated_at: Set(None),
                    body: Set(serde_json::to_string(&note)?),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                note.id = Some(inserted.id);
            }
            Some(row) => {
                let now = Utc::now();
                note.updated_at = Some(now);

                bilty_doc::ActiveModel {
                    id: Set(row.id),
                    status: Set(note.status.as_str().to_string()),
                    updated_at: Set(Some(now)),
                    body: Set(serde_json::to_string(&note)?),
                    ..Default::default()
                }
                .update(&txn)
                .await?;
            }
        }
        txn.commit().await?;
        Ok(note)
    }

    async fn fetch(&self, filter: &BiltyFilter, single: bool) -> StoreResult<Vec<Bilty>> {
        let mut clauses = Vec::new();
        let mut values: Vec<sea_orm::Value> = Vec::new();
        for (field, value) in filter.entries() {
            let fragment =
                fragment_for(field).ok_or_else(|| StoreError::UnknownFilter(field.to_string()))?;
            clauses.push(fragment);
            values.push(value.clone().into());
        }

        let mut sql = String::from(
            "SELECT id, bilty_no, created_by, status, created_at, updated_at, body FROM bilty_doc",
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC");
        if single {
            sql.push_str(" LIMIT 1");
        }

        let rows = self
            .db
            .query_all(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                &sql,
                values,
            ))
            .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let body: String = row.try_get("", "body")?;
            let mut note: Bilty = serde_json::from_str(&body)?;
            // Columns are authoritative over whatever the body carries.
            let id: i64 = row.try_get("", "id")?;
            note.id = Some(id);
            note.bilty_no = row.try_get("", "bilty_no")?;
            note.created_by = row.try_get("", "created_by")?;
            note.status = BiltyStatus::parse_str(&row.try_get::<String>("", "status")?);
            note.created_at = Some(row.try_get("", "created_at")?);
            note.updated_at = row.try_get::<Option<DateTime<Utc>>>("", "updated_at")?;
            for item in note.goods.iter_mut() {
                item.bilty_id = id;
            }
            result.push(note);
        }
        Ok(result)
    }

    async fn update_rendered_document(
        &self,
        id: i64,
        path: &str,
        rendered_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let txn = self.db.begin().await?;
        let existing = bilty_doc::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut note: Bilty = serde_json::from_str(&existing.body)?;
        note.pdf_path = Some(path.to_string());
        note.pdf_created_at = Some(rendered_at);

        bilty_doc::ActiveModel {
            id: Set(id),
            body: Set(serde_json::to_string(&note)?),
            ..Default::default()
        }
        .update(&txn)
        .await?;
        txn.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        // Goods and snapshots are embedded, so the row is the whole aggregate.
        bilty_doc::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}

/// Resolve reference payloads and embed their stored form into the note so
/// the persisted document is self-contained: creator upsert, company dedup,
/// address-book upkeep, and snapshot back-references.
async fn embed_references(txn: &DatabaseTransaction, note: &mut Bilty) -> StoreResult<()> {
    if let Some(user) = note.created_by_user.as_mut() {
        if user.id == 0 {
            user.id = note.created_by;
        }
        users::insert_if_absent(txn, user).await?;
    }
    // Embed the stored account, never the payload, so the document carries no
    // credential and updates cannot smuggle in a different creator.
    note.created_by_user = users::find_user(txn, note.created_by).await?;

    if note.consignor_company_id.is_none() {
        if let Some(company) = note.consignor_company.as_ref() {
            note.consignor_company_id = Some(companies::resolve_company(txn, company).await?);
        }
    }
    if note.consignee_company_id.is_none() {
        if let Some(company) = note.consignee_company.as_ref() {
            note.consignee_company_id = Some(companies::resolve_company(txn, company).await?);
        }
    }
    // Embed the stored rows, not the payloads: dedup may have bound the note
    // to a company whose name differs from what the caller sent.
    if let Some(id) = note.consignor_company_id {
        if let Some(company) = companies::find_company(txn, id).await? {
            note.consignor_company = Some(company);
        }
    }
    if let Some(id) = note.consignee_company_id {
        if let Some(company) = companies::find_company(txn, id).await? {
            note.consignee_company = Some(company);
        }
    }

    if let (Some(company_id), Some(snap)) =
        (note.consignor_company_id, note.consignor_address_snapshot.as_ref())
    {
        companies::resolve_company_address(txn, company_id, snap).await?;
    }
    if let (Some(company_id), Some(snap)) =
        (note.consignee_company_id, note.consignee_address_snapshot.as_ref())
    {
        companies::resolve_company_address(txn, company_id, snap).await?;
    }
    if let Some(snap) = note.consignor_address_snapshot.as_mut() {
        snap.company_id = note.consignor_company_id;
    }
    if let Some(snap) = note.consignee_address_snapshot.as_mut() {
        snap.company_id = note.consignee_company_id;
    }
    Ok(())
}

async fn next_bilty_no(txn: &DatabaseTransaction) -> StoreResult<i64> {
    let row = txn
        .query_one(Statement::from_string(
            DatabaseBackend::Sqlite,
            "SELECT COALESCE(MAX(bilty_no), 0) + 1 AS next_no FROM bilty_doc".to_string(),
        ))
        .await?;
    Ok(row
        .map(|r| r.try_get::<i64>("", "next_no"))
        .transpose()?
        .unwrap_or(1))
}
