use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Sequential storage key. Strictly private to this layer; it never
    /// crosses the repository boundary.
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Public identifier, canonical 36-char form.
    #[sea_orm(unique)]
    pub external_id: String,

    /// Stored lowercase.
    #[sea_orm(unique)]
    pub email: String,

    /// Optional handle; UNIQUE with NULLs distinct gives "unique when present".
    #[sea_orm(unique)]
    pub username: Option<String>,

    /// Argon2id password hash (PHC string)
    pub credential_hash: String,

    pub is_active: bool,

    pub is_verified: bool,

    pub full_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,

    pub avatar_url: Option<String>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,

    pub last_login_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
