use chrono::Utc;
use contracts::domain::company::aggregate::AddressSnapshot;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter,
};

use super::relational::bilty;
use crate::domain::company::repository::company_address;

pub(crate) mod bilty_address {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "bilty_address")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub company_id: Option<i64>,
        pub address_line: String,
        pub city: String,
        pub state: String,
        pub pincode: String,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<bilty_address::Model> for AddressSnapshot {
    fn from(m: bilty_address::Model) -> Self {
        AddressSnapshot {
            id: m.id,
            company_id: m.company_id,
            address_line: m.address_line,
            city: m.city,
            state: m.state,
            pincode: m.pincode,
            created_at: Some(m.created_at),
        }
    }
}

/// Reconcile the snapshot bound to one side of a note with an incoming
/// address payload.
///
/// Without a previous binding this is a plain insert. With one, an unchanged
/// address returns the existing id untouched; a changed address inserts a new
/// snapshot, moves every note still pointing at the old one over to it, and
/// reclaims the old row once nothing references it. The reference check runs
/// on the same connection as the repoint so a concurrent writer cannot slip a
/// reference in between.
pub(crate) async fn reconcile<C: ConnectionTrait>(
    conn: &C,
    company_id: Option<i64>,
    incoming: &AddressSnapshot,
    previous: Option<i64>,
) -> Result<i64, DbErr> {
    if let Some(prev_id) = previous {
        if let Some(prev) = bilty_address::Entity::find_by_id(prev_id).one(conn).await? {
            let unchanged = prev.address_line == incoming.address_line
                && prev.city == incoming.city
                && prev.state == incoming.state
                && prev.pincode == incoming.pincode;
            if unchanged {
                return Ok(prev_id);
            }
            let new_id = insert_snapshot(conn, company_id, incoming).await?;
            repoint(conn, prev_id, new_id).await?;
            reclaim_if_unreferenced(conn, prev_id).await?;
            return Ok(new_id);
        }
        // Dangling binding: fall through to a fresh insert.
    }
    insert_snapshot(conn, company_id, incoming).await
}

async fn insert_snapshot<C: ConnectionTrait>(
    conn: &C,
    company_id: Option<i64>,
    incoming: &AddressSnapshot,
) -> Result<i64, DbErr> {
    let inserted = bilty_address::ActiveModel {
        company_id: Set(company_id),
        address_line: Set(incoming.address_line.clone()),
        city: Set(incoming.city.clone()),
        state: Set(incoming.state.clone()),
        pincode: Set(incoming.pincode.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(inserted.id)
}

/// Move every note pointing at `old`, on either side, over to `new`.
async fn repoint<C: ConnectionTrait>(conn: &C, old: i64, new: i64) -> Result<(), DbErr> {
    bilty::Entity::update_many()
        .col_expr(bilty::Column::ConsignorAddressId, Expr::value(new))
        .filter(bilty::Column::ConsignorAddressId.eq(old))
        .exec(conn)
        .await?;
    bilty::Entity::update_many()
        .col_expr(bilty::Column::ConsigneeAddressId, Expr::value(new))
        .filter(bilty::Column::ConsigneeAddressId.eq(old))
        .exec(conn)
        .await?;
    Ok(())
}

pub(crate) async fn find_snapshot<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<Option<AddressSnapshot>, DbErr> {
    Ok(bilty_address::Entity::find_by_id(id)
        .one(conn)
        .await?
        .map(Into::into))
}

/// Delete a snapshot only when no note references it on either slot, then
/// drop its exact-twin address-book row if no other snapshot still backs it.
pub(crate) async fn reclaim_if_unreferenced<C: ConnectionTrait>(
    conn: &C,
    address_id: i64,
) -> Result<(), DbErr> {
    let references = bilty::Entity::find()
        .filter(
            Condition::any()
                .add(bilty::Column::ConsignorAddressId.eq(address_id))
                .add(bilty::Column::ConsigneeAddressId.eq(address_id)),
        )
        .count(conn)
        .await?;
    if references != 0 {
        return Ok(());
    }
    let Some(snapshot) = bilty_address::Entity::find_by_id(address_id).one(conn).await? else {
        return Ok(());
    };
    bilty_address::Entity::delete_by_id(address_id).exec(conn).await?;

    if let Some(company_id) = snapshot.company_id {
        let remaining = bilty_address::Entity::find()
            .filter(bilty_address::Column::CompanyId.eq(company_id))
            .filter(bilty_address::Column::AddressLine.eq(snapshot.address_line.as_str()))
            .filter(bilty_address::Column::City.eq(snapshot.city.as_str()))
            .filter(bilty_address::Column::State.eq(snapshot.state.as_str()))
            .filter(bilty_address::Column::Pincode.eq(snapshot.pincode.as_str()))
            .count(conn)
            .await?;
        if remaining == 0 {
            company_address::Entity::delete_many()
                .filter(company_address::Column::CompanyId.eq(company_id))
                .filter(company_address::Column::AddressLine.eq(snapshot.address_line.as_str()))
                .filter(company_address::Column::City.eq(snapshot.city.as_str()))
                .filter(company_address::Column::State.eq(snapshot.state.as_str()))
                .filter(company_address::Column::Pincode.eq(snapshot.pincode.as_str()))
                .exec(conn)
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::config::StorageBackend;
    use crate::shared::data::db::{bootstrap_schema, connect_memory};
    use sea_orm::{ActiveValue::NotSet, DatabaseConnection};

    async fn test_db() -> DatabaseConnection {
        let conn = connect_memory().await;
        bootstrap_schema(&conn, StorageBackend::Relational)
            .await
            .unwrap();
        conn
    }

    fn address(line: &str) -> AddressSnapshot {
        AddressSnapshot {
            address_line: line.to_string(),
            city: "Bengaluru".to_string(),
            state: "KA".to_string(),
            pincode: "560001".to_string(),
            ..Default::default()
        }
    }

    async fn note_referencing(db: &DatabaseConnection, address_id: i64) -> i64 {
        let inserted = bilty::ActiveModel {
            id: NotSet,
            bilty_no: Set(1),
            consignor_company_id: Set(None),
            consignee_company_id: Set(None),
            consignor_address_id: Set(Some(address_id)),
            consignee_address_id: Set(None),
            from_location: Set("Bengaluru".to_string()),
            to_location: Set("Chennai".to_string()),
            date: Set(chrono::NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()),
            to_pay: Set(0.0),
            gstin: Set(None),
            inv_no: Set(None),
            pvt_marks: Set(None),
            permit_no: Set(None),
            value_rupees: Set(None),
            remarks: Set(None),
            hamali: Set(None),
            dd_charges: Set(None),
            other_charges: Set(None),
            fov: Set(None),
            statistical: Set(None),
            created_by: Set(1),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            pdf_path: Set(None),
            pdf_created_at: Set(None),
            status: Set("draft".to_string()),
        }
        .insert(db)
        .await
        .unwrap();
        inserted.id
    }

    #[tokio::test]
    async fn referenced_snapshot_is_never_reclaimed() {
        let db = test_db().await;
        let snapshot_id = insert_snapshot(&db, None, &address("12 MG Road")).await.unwrap();
        let note_id = note_referencing(&db, snapshot_id).await;

        reclaim_if_unreferenced(&db, snapshot_id).await.unwrap();
        assert!(find_snapshot(&db, snapshot_id).await.unwrap().is_some());

        bilty::Entity::delete_by_id(note_id).exec(&db).await.unwrap();
        reclaim_if_unreferenced(&db, snapshot_id).await.unwrap();
        assert!(find_snapshot(&db, snapshot_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unchanged_address_keeps_the_binding() {
        let db = test_db().await;
        let first = reconcile(&db, None, &address("12 MG Road"), None).await.unwrap();
        let again = reconcile(&db, None, &address("12 MG Road"), Some(first))
            .await
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(bilty_address::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn changed_address_repoints_every_note() {
        let db = test_db().await;
        let old_id = insert_snapshot(&db, None, &address("12 MG Road")).await.unwrap();
        let first_note = note_referencing(&db, old_id).await;
        let second_note = note_referencing(&db, old_id).await;

        let new_id = reconcile(&db, None, &address("99 Residency Road"), Some(old_id))
            .await
            .unwrap();
        assert_ne!(new_id, old_id);

        for note_id in [first_note, second_note] {
            let row = bilty::Entity::find_by_id(note_id).one(&db).await.unwrap().unwrap();
            assert_eq!(row.consignor_address_id, Some(new_id));
        }
        // Every referencer moved, so the old snapshot is gone.
        assert!(find_snapshot(&db, old_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dangling_previous_binding_inserts_fresh() {
        let db = test_db().await;
        let id = reconcile(&db, None, &address("12 MG Road"), Some(404)).await.unwrap();
        assert_ne!(id, 404);
        assert!(find_snapshot(&db, id).await.unwrap().is_some());
    }
}
