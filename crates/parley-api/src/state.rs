use std::sync::Arc;

use parley_crypto::CipherKey;
use parley_db::Database;

pub type AppState = Arc<AppStateInner>;

/// Shared per-process state. Everything here is read-only after startup;
/// per-request mutability lives entirely in the database.
pub struct AppStateInner {
    pub db: Database,
    pub cipher_key: CipherKey,
    pub jwt_secret: String,
}
