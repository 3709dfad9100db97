//! Bearer token lookup. Tokens are issued elsewhere; only digests are stored.

use sha2::{Digest, Sha256};

use crate::domain::aggregates::User;
use crate::services::ServiceError;
use crate::storage::Database;

/// Lower-case hex SHA-256 of the raw token.
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

pub async fn authenticate(db: &dyn Database, token: &str) -> Result<Option<User>, ServiceError> {
    let mut tx = db.begin().await?;
    let user = tx.find_user_by_token_hash(&hash_token(token)).await?;
    tx.commit().await?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_is_stable_hex() {
        let digest = hash_token("secret");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b");
        assert_ne!(hash_token("secret2"), digest);
    }
}
