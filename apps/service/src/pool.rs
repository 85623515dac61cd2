use deadpool::managed::{self, Pool, RecycleError, RecycleResult};
use libsql::{Connection, Database, Error as LibsqlError};

/// Hands out libsql connections to one local database file
pub struct LibsqlManager {
    database: Database,
}

impl LibsqlManager {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

impl managed::Manager for LibsqlManager {
    type Type = Connection;
    type Error = LibsqlError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        self.database.connect()
    }

    async fn recycle(&self, conn: &mut Self::Type, _: &managed::Metrics) -> RecycleResult<Self::Error> {
        // A connection that cannot answer a trivial query is dropped from the pool
        let mut rows = conn.query("SELECT 1", ()).await?;
        match rows.next().await? {
            Some(_) => Ok(()),
            None => Err(RecycleError::Message("connection returned no rows for SELECT 1".into())),
        }
    }
}

pub type LibsqlPool = Pool<LibsqlManager>;

/// Open (or create) a local database file and wrap it in a pool
pub async fn open_pool(path: &str, max_size: usize) -> anyhow::Result<LibsqlPool> {
    let database = libsql::Builder::new_local(path).build().await?;
    let pool = Pool::builder(LibsqlManager::new(database)).max_size(max_size.max(1)).build()?;
    Ok(pool)
}
