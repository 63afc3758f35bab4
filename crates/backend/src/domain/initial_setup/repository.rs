use chrono::Utc;
use contracts::domain::initial_setup::aggregate::InitialSetup;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, QueryOrder};

pub(crate) mod initial_setup {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "initial_setup")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub company_name: String,
        pub address: String,
        pub city: String,
        pub state: String,
        pub pincode: String,
        pub gstin: String,
        pub footnote: String,
        pub mobile: String,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

impl From<initial_setup::Model> for InitialSetup {
    fn from(m: initial_setup::Model) -> Self {
        let mobile = serde_json::from_str(&m.mobile).unwrap_or_default();
        InitialSetup {
            id: m.id,
            company_name: m.company_name,
            address: m.address,
            city: m.city,
            state: m.state,
            pincode: m.pincode,
            gstin: m.gstin,
            footnote: m.footnote,
            mobile,
            created_at: Some(m.created_at),
        }
    }
}

pub struct InitialSetupRepository {
    db: DatabaseConnection,
}

impl InitialSetupRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert when the payload carries no id, update that row otherwise.
    /// Historical rows are kept; readers only ever see the latest.
    pub async fn save(&self, mut profile: InitialSetup) -> anyhow::Result<InitialSetup> {
        let mobile_json = serde_json::to_string(&profile.mobile)?;
        let created_at = profile.created_at.unwrap_or_else(Utc::now);
        profile.created_at = Some(created_at);

        if profile.id > 0 {
            initial_setup::ActiveModel {
                id: Set(profile.id),
                company_name: Set(profile.company_name.clone()),
                address: Set(profile.address.clone()),
                city: Set(profile.city.clone()),
                state: Set(profile.state.clone()),
                pincode: Set(profile.pincode.clone()),
                gstin: Set(profile.gstin.clone()),
                footnote: Set(profile.footnote.clone()),
                mobile: Set(mobile_json),
                created_at: Set(created_at),
            }
            .update(&self.db)
            .await?;
        } else {
            let inserted = initial_setup::ActiveModel {
                company_name: Set(profile.company_name.clone()),
                address: Set(profile.address.clone()),
                city: Set(profile.city.clone()),
                state: Set(profile.state.clone()),
                pincode: Set(profile.pincode.clone()),
                gstin: Set(profile.gstin.clone()),
                footnote: Set(profile.footnote.clone()),
                mobile: Set(mobile_json),
                created_at: Set(created_at),
                ..Default::default()
            }
            .insert(&self.db)
            .await?;
            profile.id = inserted.id;
        }
        Ok(profile)
    }

    pub async fn get_latest(&self) -> anyhow::Result<Option<InitialSetup>> {
        Ok(initial_setup::Entity::find()
            .order_by_desc(initial_setup::Column::Id)
            .one(&self.db)
            .await?
            .map(Into::into))
    }
}
