use cucumber::given;
use recon_engine::db_types::{NewTransaction, OrderId};

use crate::cucumber::{world::ReconciliationSystem, RewardsWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut RewardsWorld) {
    let system = ReconciliationSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "user '{word}' has an order {word} for {float} {word}")]
async fn registered_order(world: &mut RewardsWorld, user_id: String, order_id: String, amount: f64, currency: String) {
    let txn = NewTransaction::new(OrderId::from(order_id), user_id, amount, currency);
    world.api().register_order(txn).await.expect("Error registering order");
}
