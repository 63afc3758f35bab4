use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contracts::domain::bilty::aggregate::{Bilty, BiltyStatus, Goods};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{NotSet, Set},
    ColumnTrait, Condition, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Statement,
    TransactionTrait,
};

use super::snapshot;
use super::store::{BiltyFilter, BiltyStore};
use crate::domain::company::repository as companies;
use crate::domain::user::repository as users;
use crate::error::{StoreError, StoreResult};

pub(crate) mod bilty {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "bilty")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub bilty_no: i64,
        pub consignor_company_id: Option<i64>,
        pub consignee_company_id: Option<i64>,
        pub consignor_address_id: Option<i64>,
        pub consignee_address_id: Option<i64>,
        pub from_location: String,
        pub to_location: String,
        pub date: Date,
        pub to_pay: f64,
        pub gstin: Option<String>,
        pub inv_no: Option<String>,
        pub pvt_marks: Option<String>,
        pub permit_no: Option<String>,
        pub value_rupees: Option<f64>,
        pub remarks: Option<String>,
        pub hamali: Option<f64>,
        pub dd_charges: Option<f64>,
        pub other_charges: Option<f64>,
        pub fov: Option<f64>,
        pub statistical: Option<String>,
        pub created_by: i64,
        pub created_at: DateTimeUtc,
        pub updated_at: Option<DateTimeUtc>,
        pub pdf_path: Option<String>,
        pub pdf_created_at: Option<DateTimeUtc>,
        pub status: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub(crate) mod goods {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "goods")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub bilty_id: i64,
        pub particulars: String,
        pub num_of_pkts: i32,
        pub weight_kg: Option<f64>,
        pub rate: Option<f64>,
        pub per: Option<String>,
        pub amount: Option<f64>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<goods::Model> for Goods {
    fn from(m: goods::Model) -> Self {
        Goods {
            id: m.id,
            bilty_id: m.bilty_id,
            particulars: m.particulars,
            num_of_pkts: m.num_of_pkts,
            weight_kg: m.weight_kg,
            rate: m.rate,
            per: m.per,
            amount: m.amount,
        }
    }
}

fn column_for(field: &str) -> Option<bilty::Column> {
    match field {
        "id" => Some(bilty::Column::Id),
        "bilty_no" => Some(bilty::Column::BiltyNo),
        "status" => Some(bilty::Column::Status),
        "created_by" => Some(bilty::Column::CreatedBy),
        "from_location" => Some(bilty::Column::FromLocation),
        "to_location" => Some(bilty::Column::ToLocation),
        "consignor_company_id" => Some(bilty::Column::ConsignorCompanyId),
        "consignee_company_id" => Some(bilty::Column::ConsigneeCompanyId),
        _ => None,
    }
}

/// Normalized-tables implementation of the note engine. Every write runs in
/// one transaction; reference rows are deduplicated on the way in and
/// reclaimed once orphaned on the way out.
pub struct RelationalBiltyStore {
    db: DatabaseConnection,
}

impl RelationalBiltyStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BiltyStore for RelationalBiltyStore {
    async fn create_or_update(&self, mut note: Bilty) -> StoreResult<Bilty> {
        let created_by = note.resolved_created_by();
        if created_by == 0 {
            return Err(StoreError::Validation("created_by cannot be empty".to_string()));
        }
        note.created_by = created_by;

        let txn = self.db.begin().await?;
        resolve_parties(&txn, &mut note).await?;
        match note.id {
            None => insert_note(&txn, &mut note).await?,
            Some(id) => update_note(&txn, &mut note, id).await?,
        }
        txn.commit().await?;
        Ok(note)
    }

    async fn fetch(&self, filter: &BiltyFilter, single: bool) -> StoreResult<Vec<Bilty>> {
        let mut condition = Condition::all();
        for (field, value) in filter.entries() {
            let column =
                column_for(field).ok_or_else(|| StoreError::UnknownFilter(field.to_string()))?;
            condition = condition.add(column.eq(sea_orm::Value::from(value.clone())));
        }

        let mut query = bilty::Entity::find()
            .filter(condition)
            .order_by_desc(bilty::Column::CreatedAt);
        if single {
            query = query.limit(1);
        }
        let rows = query.all(&self.db).await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            result.push(hydrate(&self.db, row).await);
        }
        Ok(result)
    }

    async fn update_rendered_document(
        &self,
        id: i64,
        path: &str,
        rendered_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = bilty::Entity::update_many()
            .col_expr(bilty::Column::PdfPath, Expr::value(path))
            .col_expr(bilty::Column::PdfCreatedAt, Expr::value(rendered_at))
            .filter(bilty::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let txn = self.db.begin().await?;
        let Some(existing) = bilty::Entity::find_by_id(id).one(&txn).await? else {
            return Ok(());
        };
        goods::Entity::delete_many()
            .filter(goods::Column::BiltyId.eq(id))
            .exec(&txn)
            .await?;
        bilty::Entity::delete_by_id(id).exec(&txn).await?;
        for address_id in [existing.consignor_address_id, existing.consignee_address_id]
            .into_iter()
            .flatten()
        {
            snapshot::reclaim_if_unreferenced(&txn, address_id).await?;
        }
        txn.commit().await?;
        Ok(())
    }
}

/// Resolve the creator and both company sides into reference ids, keeping
/// each company's address book current along the way. Runs before the
/// create/update branch so both share it.
async fn resolve_parties(txn: &DatabaseTransaction, note: &mut Bilty) -> StoreResult<()> {
    if let Some(user) = note.created_by_user.as_mut() {
        if user.id == 0 {
            user.id = note.created_by;
        }
        users::insert_if_absent(txn, user).await?;
    }

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
    Ok(())
}

async fn insert_note(txn: &DatabaseTransaction, note: &mut Bilty) -> StoreResult<()> {
    if let Some(snap) = note.consignor_address_snapshot.as_ref() {
        let id = snapshot::reconcile(txn, note.consignor_company_id, snap, None).await?;
        note.consignor_address_id = Some(id);
    }
    if let Some(snap) = note.consignee_address_snapshot.as_ref() {
        let id = snapshot::reconcile(txn, note.consignee_company_id, snap, None).await?;
        note.consignee_address_id = Some(id);
    }

    let created_at = note.created_at.unwrap_or_else(Utc::now);
    note.created_at = Some(created_at);
    note.bilty_no = next_bilty_no(txn).await?;

    let inserted = bilty::ActiveModel {
        id: NotSet,
        bilty_no: Set(note.bilty_no),
        consignor_company_id: Set(note.consignor_company_id),
        consignee_company_id: Set(note.consignee_company_id),
        consignor_address_id: Set(note.consignor_address_id),
        consignee_address_id: Set(note.consignee_address_id),
        from_location: Set(note.from_location.clone()),
        to_location: Set(note.to_location.clone()),
        date: Set(note.date),
        to_pay: Set(note.to_pay),
        gstin: Set(note.gstin.clone()),
        inv_no: Set(note.inv_no.clone()),
        pvt_marks: Set(note.pvt_marks.clone()),
        permit_no: Set(note.permit_no.clone()),
        value_rupees: Set(note.value_rupees),
        remarks: Set(note.remarks.clone()),
        hamali: Set(note.hamali),
        dd_charges: Set(note.dd_charges),
        other_charges: Set(note.other_charges),
        fov: Set(note.fov),
        statistical: Set(note.statistical.clone()),
        created_by: Set(note.created_by),
        created_at: Set(created_at),
        updated_at: Set(None),
        pdf_path: Set(None),
        pdf_created_at: Set(None),
        status: Set(note.status.as_str().to_string()),
    }
    .insert(txn)
    .await?;
    note.id = Some(inserted.id);

    insert_goods(txn, inserted.id, &mut note.goods).await?;
    Ok(())
}

async fn update_note(txn: &DatabaseTransaction, note: &mut Bilty, id: i64) -> StoreResult<()> {
    let existing = bilty::Entity::find_by_id(id)
        .one(txn)
        .await?
        .ok_or(StoreError::NotFound)?;

    // Storage-owned fields survive any payload.
    note.bilty_no = existing.bilty_no;
    note.created_at = Some(existing.created_at);
    note.created_by = existing.created_by;
    note.pdf_path = existing.pdf_path.clone();
    note.pdf_created_at = existing.pdf_created_at;
    if note.consignor_company_id.is_none() {
        note.consignor_company_id = existing.consignor_company_id;
    }
    if note.consignee_company_id.is_none() {
        note.consignee_company_id = existing.consignee_company_id;
    }

    if let Some(snap) = note.consignor_address_snapshot.as_ref() {
        let previous = note.consignor_address_id.or(existing.consignor_address_id);
        let resolved =
            snapshot::reconcile(txn, note.consignor_company_id, snap, previous).await?;
        note.consignor_address_id = Some(resolved);
    } else if note.consignor_address_id.is_none() {
        note.consignor_address_id = existing.consignor_address_id;
    }
    if let Some(snap) = note.consignee_address_snapshot.as_ref() {
        let previous = note.consignee_address_id.or(existing.consignee_address_id);
        let resolved =
            snapshot::reconcile(txn, note.consignee_company_id, snap, previous).await?;
        note.consignee_address_id = Some(resolved);
    } else if note.consignee_address_id.is_none() {
        note.consignee_address_id = existing.consignee_address_id;
    }

    let now = Utc::now();
    note.updated_at = Some(now);
    bilty::ActiveModel {
        id: Set(id),
        bilty_no: NotSet,
        consignor_company_id: Set(note.consignor_company_id),
        consignee_company_id: Set(note.consignee_company_id),
        consignor_address_id: Set(note.consignor_address_id),
        consignee_address_id: Set(note.consignee_address_id),
        from_location: Set(note.from_location.clone()),
        to_location: Set(note.to_location.clone()),
        date: Set(note.date),
        to_pay: Set(note.to_pay),
        gstin: Set(note.gstin.clone()),
        inv_no: Set(note.inv_no.clone()),
        pvt_marks: Set(note.pvt_marks.clone()),
        permit_no: Set(note.permit_no.clone()),
        value_rupees: Set(note.value_rupees),
        remarks: Set(note.remarks.clone()),
        hamali: Set(note.hamali),
        dd_charges: Set(note.dd_charges),
        other_charges: Set(note.other_charges),
        fov: Set(note.fov),
        statistical: Set(note.statistical.clone()),
        created_by: NotSet,
        created_at: NotSet,
        updated_at: Set(Some(now)),
        pdf_path: NotSet,
        pdf_created_at: NotSet,
        status: Set(note.status.as_str().to_string()),
    }
    .update(txn)
    .await?;

    // Goods are replaced wholesale, never patched row by row.
    goods::Entity::delete_many()
        .filter(goods::Column::BiltyId.eq(id))
        .exec(txn)
        .await?;
    insert_goods(txn, id, &mut note.goods).await?;
    Ok(())
}

async fn insert_goods(
    txn: &DatabaseTransaction,
    bilty_id: i64,
    items: &mut [Goods],
) -> StoreResult<()> {
    for item in items.iter_mut() {
        let inserted = goods::ActiveModel {
            bilty_id: Set(bilty_id),
            particulars: Set(item.particulars.clone()),
            num_of_pkts: Set(item.num_of_pkts),
            weight_kg: Set(item.weight_kg),
            rate: Set(item.rate),
            per: Set(item.per.clone()),
            amount: Set(item.amount),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        item.id = inserted.id;
        item.bilty_id = bilty_id;
    }
    Ok(())
}

/// Next display number, assigned inside the writer's transaction.
async fn next_bilty_no(txn: &DatabaseTransaction) -> StoreResult<i64> {
    let row = txn
        .query_one(Statement::from_string(
            DatabaseBackend::Sqlite,
            "SELECT COALESCE(MAX(bilty_no), 0) + 1 AS next_no FROM bilty".to_string(),
        ))
        .await?;
    Ok(row
        .map(|r| r.try_get::<i64>("", "next_no"))
        .transpose()?
        .unwrap_or(1))
}

/// Attach nested entities to a fetched row. A nested row that fails to load
/// leaves its field unset; a missing company must not hide an otherwise valid
/// note.
async fn hydrate<C: ConnectionTrait>(conn: &C, row: bilty::Model) -> Bilty {
    let mut note = base_note(row);
    let note_id = note.id.unwrap_or_default();

    if let Some(id) = note.consignor_company_id {
        if let Ok(Some(company)) = companies::find_company(conn, id).await {
            note.consignor_company = Some(company);
        }
    }
    if let Some(id) = note.consignee_company_id {
        if let Ok(Some(company)) = companies::find_company(conn, id).await {
            note.consignee_company = Some(company);
        }
    }
    if let Some(id) = note.consignor_address_id {
        if let Ok(Some(snap)) = snapshot::find_snapshot(conn, id).await {
            note.consignor_address_snapshot = Some(snap);
        }
    }
    if let Some(id) = note.consignee_address_id {
        if let Ok(Some(snap)) = snapshot::find_snapshot(conn, id).await {
            note.consignee_address_snapshot = Some(snap);
        }
    }
    if let Ok(rows) = goods::Entity::find()
        .filter(goods::Column::BiltyId.eq(note_id))
        .order_by_asc(goods::Column::Id)
        .all(conn)
        .await
    {
        note.goods = rows.into_iter().map(Into::into).collect();
    }
    if note.created_by != 0 {
        if let Ok(Some(user)) = users::find_user(conn, note.created_by).await {
            note.created_by_user = Some(user);
        }
    }
    note
}

fn base_note(m: bilty::Model) -> Bilty {
    Bilty {
        id: Some(m.id),
        bilty_no: m.bilty_no,
        consignor_company_id: m.consignor_company_id,
        consignee_company_id: m.consignee_company_id,
        consignor_address_id: m.consignor_address_id,
        consignee_address_id: m.consignee_address_id,
        from_location: m.from_location,
        to_location: m.to_location,
        date: m.date,
        to_pay: m.to_pay,
        gstin: m.gstin,
        inv_no: m.inv_no,
        pvt_marks: m.pvt_marks,
        permit_no: m.permit_no,
        value_rupees: m.value_rupees,
        remarks: m.remarks,
        hamali: m.hamali,
        dd_charges: m.dd_charges,
        other_charges: m.other_charges,
        fov: m.fov,
        statistical: m.statistical,
        created_by: m.created_by,
        created_at: Some(m.created_at),
        updated_at: m.updated_at,
        pdf_path: m.pdf_path,
        pdf_created_at: m.pdf_created_at,
        status: BiltyStatus::parse_str(&m.status),
        consignor_company: None,
        consignee_company: None,
        consignor_address_snapshot: None,
        consignee_address_snapshot: None,
        created_by_user: None,
        goods: Vec::new(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::bilty::snapshot::bilty_address;
    use crate::domain::company::repository::{company, company_address};
    use crate::shared::config::StorageBackend;
    use crate::shared::data::db::{bootstrap_schema, connect_memory};
    use chrono::{Duration, NaiveDate};
    use contracts::domain::company::aggregate::{AddressSnapshot, Company};
    use contracts::domain::user::aggregate::AppUser;
    use sea_orm::PaginatorTrait;

    async fn store() -> RelationalBiltyStore {
        let conn = connect_memory().await;
        bootstrap_schema(&conn, StorageBackend::Relational)
            .await
            .unwrap();
        RelationalBiltyStore::new(conn)
    }

    pub(crate) fn snapshot_payload(line: &str) -> AddressSnapshot {
        AddressSnapshot {
            address_line: line.to_string(),
            city: "Bengaluru".to_string(),
            state: "KA".to_string(),
            pincode: "560001".to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn note_payload() -> Bilty {
        let mut note: Bilty = serde_json::from_str(r#"{"date":"2025-04-01"}"#).unwrap();
        note.from_location = "Bengaluru".to_string();
        note.to_location = "Chennai".to_string();
        note.to_pay = 1250.50;
        note.created_by_user = Some(AppUser {
            id: 3,
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            role: "operator".to_string(),
            ..Default::default()
        });
        note.consignor_company = Some(Company {
            name: "Sharma Traders".to_string(),
            gstin: Some("29AAAAA0000A1Z5".to_string()),
            ..Default::default()
        });
        note.consignor_address_snapshot = Some(snapshot_payload("12 MG Road"));
        note.consignee_company = Some(Company {
            name: "Chennai Mills".to_string(),
            gstin: Some("33CCCCC2222C3Z7".to_string()),
            ..Default::default()
        });
        note.consignee_address_snapshot = Some(snapshot_payload("4 Harbour Line"));
        note.goods = vec![
            Goods {
                particulars: "Cotton bales".to_string(),
                num_of_pkts: 12,
                weight_kg: Some(480.25),
                rate: Some(3.75),
                per: Some("kg".to_string()),
                amount: Some(1800.9375),
                ..Default::default()
            },
            Goods {
                particulars: "Yarn cones".to_string(),
                num_of_pkts: 4,
                ..Default::default()
            },
        ];
        note
    }

    #[tokio::test]
    async fn create_assigns_id_and_sequential_numbers() {
        let store = store().await;
        let first = store.create_or_update(note_payload()).await.unwrap();
        let second = store.create_or_update(note_payload()).await.unwrap();

        assert!(first.id.unwrap() > 0);
        assert_eq!(first.bilty_no, 1);
        assert_eq!(second.bilty_no, 2);
        assert!(second.bilty_no > first.bilty_no);
        assert_ne!(first.id, second.id);
        assert!(first.created_at.is_some());
    }

    #[tokio::test]
    async fn identical_creates_are_not_deduplicated() {
        let store = store().await;
        store.create_or_update(note_payload()).await.unwrap();
        store.create_or_update(note_payload()).await.unwrap();
        assert_eq!(bilty::Entity::find().count(&store.db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn shared_gstin_binds_to_one_company_with_original_name() {
        let store = store().await;
        let first = store.create_or_update(note_payload()).await.unwrap();

        let mut second = note_payload();
        second.consignor_company.as_mut().unwrap().name = "Sharma & Sons".to_string();
        let second = store.create_or_update(second).await.unwrap();

        assert_eq!(first.consignor_company_id, second.consignor_company_id);

        let fetched = store.fetch_by_id(second.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(
            fetched.consignor_company.unwrap().name,
            "Sharma Traders"
        );

        let mut third = note_payload();
        third.consignor_company.as_mut().unwrap().gstin = Some("07DDDDD3333D4Z8".to_string());
        let third = store.create_or_update(third).await.unwrap();
        assert_ne!(first.consignor_company_id, third.consignor_company_id);
    }

    #[tokio::test]
    async fn unchanged_address_update_keeps_snapshot_row() {
        let store = store().await;
        let created = store.create_or_update(note_payload()).await.unwrap();
        let rows_before = bilty_address::Entity::find().count(&store.db).await.unwrap();

        let mut update = note_payload();
        update.id = created.id;
        update.remarks = Some("second copy".to_string());
        let updated = store.create_or_update(update).await.unwrap();

        assert_eq!(updated.consignor_address_id, created.consignor_address_id);
        assert_eq!(
            bilty_address::Entity::find().count(&store.db).await.unwrap(),
            rows_before
        );
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn changed_address_update_swaps_and_reclaims() {
        let store = store().await;
        let created = store.create_or_update(note_payload()).await.unwrap();
        let old_address_id = created.consignor_address_id.unwrap();

        let mut update = note_payload();
        update.id = created.id;
        update.consignor_address_snapshot = Some(snapshot_payload("99 Residency Road"));
        let updated = store.create_or_update(update).await.unwrap();
        let new_address_id = updated.consignor_address_id.unwrap();

        assert_ne!(new_address_id, old_address_id);
        let still_pointing = bilty::Entity::find()
            .filter(
                Condition::any()
                    .add(bilty::Column::ConsignorAddressId.eq(old_address_id))
                    .add(bilty::Column::ConsigneeAddressId.eq(old_address_id)),
            )
            .count(&store.db)
            .await
            .unwrap();
        assert_eq!(still_pointing, 0);
        assert!(bilty_address::Entity::find_by_id(old_address_id)
            .one(&store.db)
            .await
            .unwrap()
            .is_none());
        // The address book twin lost its last backing snapshot too.
        let twins = company_address::Entity::find()
            .filter(company_address::Column::AddressLine.eq("12 MG Road"))
            .count(&store.db)
            .await
            .unwrap();
        assert_eq!(twins, 0);
    }

    #[tokio::test]
    async fn notes_sharing_a_snapshot_are_repointed_together() {
        let store = store().await;
        let first = store.create_or_update(note_payload()).await.unwrap();
        let shared_address = first.consignor_address_id;

        let mut second = note_payload();
        second.consignor_address_snapshot = None;
        second.consignor_address_id = shared_address;
        let second = store.create_or_update(second).await.unwrap();
        assert_eq!(second.consignor_address_id, shared_address);

        let mut update = note_payload();
        update.id = first.id;
        update.consignor_address_snapshot = Some(snapshot_payload("99 Residency Road"));
        let updated = store.create_or_update(update).await.unwrap();

        let refetched = store.fetch_by_id(second.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(refetched.consignor_address_id, updated.consignor_address_id);
        assert!(bilty_address::Entity::find_by_id(shared_address.unwrap())
            .one(&store.db)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn goods_round_trip_preserves_numbers_exactly() {
        let store = store().await;
        let mut payload = note_payload();
        payload.goods = vec![
            Goods {
                particulars: "Machine parts".to_string(),
                num_of_pkts: 3,
                weight_kg: Some(123.456789),
                rate: Some(0.1),
                per: Some("kg".to_string()),
                amount: Some(12.3456789),
                ..Default::default()
            },
            Goods {
                particulars: "Fasteners".to_string(),
                num_of_pkts: 250,
                weight_kg: Some(19.875),
                rate: None,
                per: None,
                amount: None,
                ..Default::default()
            },
            Goods {
                particulars: "Oil drums".to_string(),
                num_of_pkts: 8,
                weight_kg: None,
                rate: Some(410.0),
                per: Some("drum".to_string()),
                amount: Some(3280.0),
                ..Default::default()
            },
        ];
        let created = store.create_or_update(payload).await.unwrap();

        let fetched = store.fetch_by_id(created.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(fetched.goods.len(), 3);
        assert_eq!(fetched.goods[0].weight_kg, Some(123.456789));
        assert_eq!(fetched.goods[0].amount, Some(12.3456789));
        assert_eq!(fetched.goods[1].num_of_pkts, 250);
        assert_eq!(fetched.goods[1].weight_kg, Some(19.875));
        assert_eq!(fetched.goods[2].amount, Some(3280.0));
    }

    #[tokio::test]
    async fn update_replaces_goods_wholesale() {
        let store = store().await;
        let created = store.create_or_update(note_payload()).await.unwrap();
        assert_eq!(created.goods.len(), 2);

        let mut update = note_payload();
        update.id = created.id;
        update.goods = vec![Goods {
            particulars: "Replacement cartons".to_string(),
            num_of_pkts: 7,
            ..Default::default()
        }];
        store.create_or_update(update).await.unwrap();

        assert_eq!(goods::Entity::find().count(&store.db).await.unwrap(), 1);
        let fetched = store.fetch_by_id(created.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(fetched.goods.len(), 1);
        assert_eq!(fetched.goods[0].particulars, "Replacement cartons");
    }

    #[tokio::test]
    async fn missing_creator_fails_before_anything_is_written() {
        let store = store().await;
        let mut payload = note_payload();
        payload.created_by = 0;
        payload.created_by_user = None;

        let err = store.create_or_update(payload).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(bilty::Entity::find().count(&store.db).await.unwrap(), 0);
        assert_eq!(company::Entity::find().count(&store.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_update_rolls_back_reference_writes() {
        let store = store().await;
        let mut payload = note_payload();
        payload.id = Some(999);

        let err = store.create_or_update(payload).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        // The companies resolved earlier in the transaction must not survive.
        assert_eq!(company::Entity::find().count(&store.db).await.unwrap(), 0);
        assert_eq!(
            company_address::Entity::find().count(&store.db).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn delete_cascades_goods_and_reclaims_snapshots() {
        let store = store().await;
        let created = store.create_or_update(note_payload()).await.unwrap();

        store.delete(created.id.unwrap()).await.unwrap();

        assert_eq!(bilty::Entity::find().count(&store.db).await.unwrap(), 0);
        assert_eq!(goods::Entity::find().count(&store.db).await.unwrap(), 0);
        assert_eq!(
            bilty_address::Entity::find().count(&store.db).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn delete_spares_snapshots_still_referenced_elsewhere() {
        let store = store().await;
        let first = store.create_or_update(note_payload()).await.unwrap();

        let mut second = note_payload();
        second.consignor_address_snapshot = None;
        second.consignor_address_id = first.consignor_address_id;
        let second = store.create_or_update(second).await.unwrap();

        store.delete(first.id.unwrap()).await.unwrap();

        assert!(bilty_address::Entity::find_by_id(first.consignor_address_id.unwrap())
            .one(&store.db)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .fetch_by_id(second.id.unwrap())
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn deleting_unknown_id_is_a_noop() {
        let store = store().await;
        store.delete(424242).await.unwrap();
    }

    #[tokio::test]
    async fn fetch_with_no_match_is_empty_not_an_error() {
        let store = store().await;
        let result = store
            .fetch(&BiltyFilter::new().with("status", "complete"), true)
            .await
            .unwrap();
        assert!(result.is_empty());
        assert!(store.fetch_by_id(31337).await.unwrap().is_none());
    }

    #[test]
    fn every_whitelisted_field_maps_to_a_column() {
        for field in crate::domain::bilty::store::FILTERABLE_FIELDS {
            assert!(column_for(field).is_some(), "unmapped filter field {field}");
        }
    }

    #[tokio::test]
    async fn update_never_changes_the_creator() {
        let store = store().await;
        let created = store.create_or_update(note_payload()).await.unwrap();
        assert_eq!(created.created_by, 3);

        let mut update = note_payload();
        update.id = created.id;
        update.created_by_user = Some(AppUser {
            id: 8,
            name: "Vikram".to_string(),
            email: "vikram@example.com".to_string(),
            ..Default::default()
        });
        let updated = store.create_or_update(update).await.unwrap();
        assert_eq!(updated.created_by, 3);

        let fetched = store.fetch_by_id(created.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(fetched.created_by_user.unwrap().id, 3);
    }

    #[tokio::test]
    async fn unknown_filter_field_is_rejected() {
        let store = store().await;
        let err = store
            .fetch(&BiltyFilter::new().with("password_hash", "x"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownFilter(_)));
    }

    #[tokio::test]
    async fn fetch_orders_newest_first_and_single_takes_latest() {
        let store = store().await;
        let mut older = note_payload();
        older.created_at = Some(Utc::now() - Duration::hours(2));
        let older = store.create_or_update(older).await.unwrap();
        let newer = store.create_or_update(note_payload()).await.unwrap();

        let all = store
            .fetch(&BiltyFilter::new().with("from_location", "Bengaluru"), false)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, newer.id);
        assert_eq!(all[1].id, older.id);

        let single = store
            .fetch(&BiltyFilter::new().with("from_location", "Bengaluru"), true)
            .await
            .unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].id, newer.id);
    }

    #[tokio::test]
    async fn hydration_degrades_gracefully_when_reference_rows_vanish() {
        let store = store().await;
        let created = store.create_or_update(note_payload()).await.unwrap();

        company::Entity::delete_by_id(created.consignor_company_id.unwrap())
            .exec(&store.db)
            .await
            .unwrap();

        let fetched = store.fetch_by_id(created.id.unwrap()).await.unwrap().unwrap();
        assert!(fetched.consignor_company.is_none());
        assert!(fetched.consignee_company.is_some());
        assert_eq!(fetched.goods.len(), 2);
    }

    #[tokio::test]
    async fn hydrated_creator_carries_no_credential() {
        let store = store().await;
        let created = store.create_or_update(note_payload()).await.unwrap();
        let fetched = store.fetch_by_id(created.id.unwrap()).await.unwrap().unwrap();
        let creator = fetched.created_by_user.unwrap();
        assert_eq!(creator.id, 3);
        assert!(creator.password.is_empty());
    }

    #[tokio::test]
    async fn rendered_document_info_is_recorded_and_staleness_tracks_updates() {
        let store = store().await;
        let created = store.create_or_update(note_payload()).await.unwrap();
        let id = created.id.unwrap();
        assert!(created.needs_render());

        store
            .update_rendered_document(id, "bilty/BLT-1.pdf", Utc::now())
            .await
            .unwrap();
        let fetched = store.fetch_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.pdf_path.as_deref(), Some("bilty/BLT-1.pdf"));
        assert!(!fetched.needs_render());

        let mut update = note_payload();
        update.id = Some(id);
        store.create_or_update(update).await.unwrap();
        let fetched = store.fetch_by_id(id).await.unwrap().unwrap();
        assert!(fetched.needs_render());

        let err = store
            .update_rendered_document(999, "nope.pdf", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn update_without_snapshot_payload_keeps_binding() {
        let store = store().await;
        let created = store.create_or_update(note_payload()).await.unwrap();

        let mut update = note_payload();
        update.id = created.id;
        update.consignor_address_snapshot = None;
        update.consignee_address_snapshot = None;
        let updated = store.create_or_update(update).await.unwrap();

        assert_eq!(updated.consignor_address_id, created.consignor_address_id);
        assert_eq!(updated.consignee_address_id, created.consignee_address_id);
    }

    #[tokio::test]
    async fn sides_are_independent_and_optional() {
        let store = store().await;
        let mut payload = note_payload();
        payload.consignee_company = None;
        payload.consignee_address_snapshot = None;
        let created = store.create_or_update(payload).await.unwrap();

        assert!(created.consignor_company_id.is_some());
        assert!(created.consignee_company_id.is_none());
        assert!(created.consignee_address_id.is_none());

        let fetched = store.fetch_by_id(created.id.unwrap()).await.unwrap().unwrap();
        assert!(fetched.consignee_company.is_none());
        assert!(fetched.consignor_address_snapshot.is_some());
    }

    #[tokio::test]
    async fn dates_survive_the_round_trip() {
        let store = store().await;
        let created = store.create_or_update(note_payload()).await.unwrap();
        let fetched = store.fetch_by_id(created.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(fetched.date, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
    }
}
