use cucumber::World;
use log::*;
use recon_engine::{
    db_types::LedgerEntry,
    events::EventProducers,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    LedgerError,
    ReconciliationApi,
    RewardsApi,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct RewardsWorld {
    pub system: Option<ReconciliationSystem>,
    pub last_withdrawal: Option<Result<LedgerEntry, LedgerError>>,
}

#[derive(Debug)]
pub struct ReconciliationSystem {
    pub db_path: String,
    pub api: ReconciliationApi<SqliteDatabase>,
    pub rewards: RewardsApi<SqliteDatabase>,
}

impl RewardsWorld {
    pub fn api(&self) -> &ReconciliationApi<SqliteDatabase> {
        &self.system.as_ref().expect("ReconciliationApi not initialised").api
    }

    pub fn rewards(&self) -> &RewardsApi<SqliteDatabase> {
        &self.system.as_ref().expect("RewardsApi not initialised").rewards
    }

    pub fn db(&self) -> &SqliteDatabase {
        self.api().db()
    }
}

impl ReconciliationSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let api = ReconciliationApi::new(db.clone(), EventProducers::default());
        let rewards = RewardsApi::new(db);
        Self { db_path: url, api, rewards }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
