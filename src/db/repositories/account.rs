use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, Set, SqlErr,
};

use crate::entities::{accounts, prelude::*};
use crate::models::account::{Account, AccountChanges, NewAccountRecord};
use crate::security::ExternalId;
use crate::services::directory::{AccountDirectory, ConflictField, DirectoryError};

/// Sea-ORM backed [`AccountDirectory`]. Uniqueness of email, username and
/// external id is enforced by UNIQUE constraints on the `accounts` table,
/// so races between concurrent inserts are settled here, not above.
#[derive(Clone)]
pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

fn map_db_err(err: sea_orm::DbErr) -> DirectoryError {
    DirectoryError::Database(err.to_string())
}

/// Writes can trip a UNIQUE constraint; everything else is a storage failure.
fn map_write_err(err: sea_orm::DbErr) -> DirectoryError {
    if let Some(SqlErr::UniqueConstraintViolation(message)) = err.sql_err() {
        if message.contains("accounts.email") {
            return DirectoryError::Conflict(ConflictField::Email);
        }
        if message.contains("accounts.username") {
            return DirectoryError::Conflict(ConflictField::Username);
        }
    }
    map_db_err(err)
}

/// The row's external id was written by us in canonical form; anything else
/// means the row is corrupt.
fn to_account(model: accounts::Model) -> Result<Account, DirectoryError> {
    let external_id = ExternalId::parse(&model.external_id).map_err(|_| {
        DirectoryError::Database(format!(
            "account row {} carries a non-canonical external id",
            model.id
        ))
    })?;

    Ok(Account {
        external_id,
        email: model.email,
        username: model.username,
        credential_hash: model.credential_hash,
        is_active: model.is_active,
        is_verified: model.is_verified,
        full_name: model.full_name,
        bio: model.bio,
        avatar_url: model.avatar_url,
        created_at: model.created_at,
        updated_at: model.updated_at,
        last_login_at: model.last_login_at,
    })
}

#[async_trait]
impl AccountDirectory for AccountRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DirectoryError> {
        let model = Accounts::find()
            .filter(accounts::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .map_err(map_db_err)?;

        model.map(to_account).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DirectoryError> {
        let model = Accounts::find()
            .filter(accounts::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .map_err(map_db_err)?;

        model.map(to_account).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Account>, DirectoryError> {
        let model = Accounts::find()
            .filter(accounts::Column::ExternalId.eq(external_id))
            .one(&self.conn)
            .await
            .map_err(map_db_err)?;

        model.map(to_account).transpose()
    }

    async fn insert(&self, record: NewAccountRecord) -> Result<Account, DirectoryError> {
        let now = Utc::now();

        let active_model = accounts::ActiveModel {
            external_id: Set(record.external_id.to_string()),
            email: Set(record.email),
            username: Set(record.username),
            credential_hash: Set(record.credential_hash),
            is_active: Set(true),
            is_verified: Set(false),
            full_name: Set(record.full_name),
            bio: Set(None),
            avatar_url: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
            ..Default::default()
        };

        let model = active_model.insert(&self.conn).await.map_err(map_write_err)?;
        to_account(model)
    }

    async fn update(
        &self,
        external_id: &str,
        changes: AccountChanges,
    ) -> Result<Account, DirectoryError> {
        let model = Accounts::find()
            .filter(accounts::Column::ExternalId.eq(external_id))
            .one(&self.conn)
            .await
            .map_err(map_db_err)?
            .ok_or(DirectoryError::NotFound)?;

        let mut active_model = model.into_active_model();

        if let Some(email) = changes.email {
            active_model.email = Set(email);
        }
        if let Some(username) = changes.username {
            active_model.username = Set(Some(username));
        }
        if let Some(full_name) = changes.full_name {
            active_model.full_name = Set(Some(full_name));
        }
        if let Some(bio) = changes.bio {
            active_model.bio = Set(Some(bio));
        }
        if let Some(avatar_url) = changes.avatar_url {
            active_model.avatar_url = Set(Some(avatar_url));
        }
        if let Some(credential_hash) = changes.credential_hash {
            active_model.credential_hash = Set(credential_hash);
        }
        active_model.updated_at = Set(Utc::now());

        let model = active_model.update(&self.conn).await.map_err(map_write_err)?;
        to_account(model)
    }

    async fn delete(&self, external_id: &str) -> Result<bool, DirectoryError> {
        let result = Accounts::delete_many()
            .filter(accounts::Column::ExternalId.eq(external_id))
            .exec(&self.conn)
            .await
            .map_err(map_db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn record_login(&self, external_id: &str) -> Result<(), DirectoryError> {
        Accounts::update_many()
            .col_expr(accounts::Column::LastLoginAt, Expr::value(Utc::now()))
            .filter(accounts::Column::ExternalId.eq(external_id))
            .exec(&self.conn)
            .await
            .map_err(map_db_err)?;

        Ok(())
    }

    async fn count(&self) -> Result<u64, DirectoryError> {
        Accounts::find().count(&self.conn).await.map_err(map_db_err)
    }
}
