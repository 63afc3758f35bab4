use chrono::Utc;
use contracts::domain::company::aggregate::{AddressSnapshot, Company};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter,
};

pub(crate) mod company {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "company")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub name: String,
        pub gstin: Option<String>,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub(crate) mod company_address {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "company_address")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub company_id: i64,
        pub address_line: String,
        pub city: String,
        pub state: String,
        pub pincode: String,
        pub is_default: bool,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<company::Model> for Company {
    fn from(m: company::Model) -> Self {
        Company {
            id: m.id,
            name: m.name,
            gstin: m.gstin,
            created_at: Some(m.created_at),
        }
    }
}

/// Resolve a company payload to a stable row id.
///
/// A payload carrying an id is taken at face value (the row is created with
/// that id if absent, matching values from an export). A payload with a GSTIN
/// reuses the existing row with that GSTIN regardless of name differences.
/// Anything else inserts a fresh row.
pub(crate) async fn resolve_company<C: ConnectionTrait>(
    conn: &C,
    candidate: &Company,
) -> Result<i64, DbErr> {
    if candidate.id != 0 {
        if company::Entity::find_by_id(candidate.id).one(conn).await?.is_none() {
            company::ActiveModel {
                id: Set(candidate.id),
                name: Set(candidate.name.clone()),
                gstin: Set(candidate.gstin.clone()),
                created_at: Set(candidate.created_at.unwrap_or_else(Utc::now)),
            }
            .insert(conn)
            .await?;
        }
        return Ok(candidate.id);
    }

    if let Some(gstin) = candidate.gstin.as_deref().filter(|g| !g.is_empty()) {
        if let Some(existing) = company::Entity::find()
            .filter(company::Column::Gstin.eq(gstin))
            .one(conn)
            .await?
        {
            return Ok(existing.id);
        }
    }

    let inserted = company::ActiveModel {
        name: Set(candidate.name.clone()),
        gstin: Set(candidate.gstin.clone()),
        created_at: Set(candidate.created_at.unwrap_or_else(Utc::now)),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(inserted.id)
}

/// Resolve an address payload against the company's address book: exact-field
/// lookup, insert when no row matches. Keeps the book current without ever
/// touching snapshot rows.
pub(crate) async fn resolve_company_address<C: ConnectionTrait>(
    conn: &C,
    company_id: i64,
    address: &AddressSnapshot,
) -> Result<i64, DbErr> {
    if let Some(existing) = company_address::Entity::find()
        .filter(company_address::Column::CompanyId.eq(company_id))
        .filter(company_address::Column::AddressLine.eq(address.address_line.as_str()))
        .filter(company_address::Column::City.eq(address.city.as_str()))
        .filter(company_address::Column::State.eq(address.state.as_str()))
        .filter(company_address::Column::Pincode.eq(address.pincode.as_str()))
        .one(conn)
        .await?
    {
        return Ok(existing.id);
    }

    let inserted = company_address::ActiveModel {
        company_id: Set(company_id),
        address_line: Set(address.address_line.clone()),
        city: Set(address.city.clone()),
        state: Set(address.state.clone()),
        pincode: Set(address.pincode.clone()),
        is_default: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(inserted.id)
}

pub(crate) async fn find_company<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<Option<Company>, DbErr> {
    Ok(company::Entity::find_by_id(id)
        .one(conn)
        .await?
        .map(Into::into))
}
