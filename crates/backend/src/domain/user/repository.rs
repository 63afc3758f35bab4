use chrono::Utc;
use contracts::domain::user::aggregate::AppUser;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter,
};

pub(crate) mod app_user {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "app_user")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub name: String,
        pub email: String,
        pub role: String,
        pub password_hash: String,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<app_user::Model> for AppUser {
    fn from(m: app_user::Model) -> Self {
        AppUser {
            id: m.id,
            name: m.name,
            email: m.email,
            role: m.role,
            password: String::new(),
            created_at: Some(m.created_at),
        }
    }
}

/// Insert the creator payload carried on a consignment note unless a row with
/// that id already exists. An existing account is never overwritten from this
/// path, and no credential is stored through it either.
pub(crate) async fn insert_if_absent<C: ConnectionTrait>(
    conn: &C,
    user: &AppUser,
) -> Result<(), DbErr> {
    if app_user::Entity::find_by_id(user.id).one(conn).await?.is_some() {
        return Ok(());
    }
    app_user::ActiveModel {
        id: Set(user.id),
        name: Set(user.name.clone()),
        email: Set(user.email.clone()),
        role: Set(user.role.clone()),
        password_hash: Set(String::new()),
        created_at: Set(user.created_at.unwrap_or_else(Utc::now)),
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Load an account without its credential.
pub(crate) async fn find_user<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<Option<AppUser>, DbErr> {
    Ok(app_user::Entity::find_by_id(id)
        .one(conn)
        .await?
        .map(Into::into))
}

pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, user: &AppUser, password_hash: &str) -> anyhow::Result<i64> {
        let inserted = app_user::ActiveModel {
            name: Set(user.name.clone()),
            email: Set(user.email.clone()),
            role: Set(user.role.clone()),
            password_hash: Set(password_hash.to_string()),
            created_at: Set(user.created_at.unwrap_or_else(Utc::now)),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(inserted.id)
    }

    pub async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<AppUser>> {
        Ok(self
            .find_by_email_with_hash(email)
            .await?
            .map(|(user, _)| user))
    }

    /// Account plus its stored credential hash, for login verification only.
    pub async fn find_by_email_with_hash(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<(AppUser, String)>> {
        let found = app_user::Entity::find()
            .filter(app_user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(found.map(|m| {
            let hash = m.password_hash.clone();
            (AppUser::from(m), hash)
        }))
    }

    pub async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<AppUser>> {
        Ok(find_user(&self.db, id).await?)
    }
}
