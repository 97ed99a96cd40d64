use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn, orm_from_pool},
    password::PasswordKdf,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub kdf: PasswordKdf,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(pool: DbPool, jwt_secret: &str) -> Self {
        Self::with_kdf(pool, jwt_secret, PasswordKdf::default())
    }

    pub fn with_kdf(pool: DbPool, jwt_secret: &str, kdf: PasswordKdf) -> Self {
        let orm = orm_from_pool(&pool);
        Self {
            pool,
            orm,
            kdf,
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}
