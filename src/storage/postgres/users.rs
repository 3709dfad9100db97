//! Users repository

use sqlx::{postgres::PgRow, query_as, FromRow, Row};

use super::PgTx;
use crate::domain::aggregates::User;
use crate::storage::StoreError;

#[derive(Debug)]
struct UserRow(User);

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            is_admin: row.try_get("is_admin")?,
        }))
    }
}

const FIND_BY_TOKEN_HASH_SQL: &str = "SELECT u.id, u.name, u.email, u.is_admin \
     FROM api_tokens t JOIN users u ON u.id = t.user_id \
     WHERE t.token_hash = $1 AND (t.expires_at IS NULL OR t.expires_at > NOW())";

pub(super) async fn find_by_token_hash(tx: &mut PgTx, token_hash: &str) -> Result<Option<User>, StoreError> {
    let row = query_as::<_, UserRow>(FIND_BY_TOKEN_HASH_SQL).bind(token_hash).fetch_optional(&mut **tx).await?;
    Ok(row.map(|r| r.0))
}
