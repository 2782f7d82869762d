// ABOUTME: Integration tests for the lazily reconnecting engine connection.
// ABOUTME: Uses the in-memory engine to simulate outages.

mod support;

use labs_launcher::engine::EngineConnection;
use std::sync::Arc;
use support::fake_engine::{Call, FakeConnector, FakeEngine};

fn connection() -> (FakeEngine, Arc<FakeConnector>, EngineConnection) {
    support::init_tracing();
    let engine = FakeEngine::new();
    let connector = Arc::new(FakeConnector::new(engine.clone()));
    let connection = EngineConnection::new(connector.clone());
    (engine, connector, connection)
}

#[tokio::test]
async fn client_is_built_once_and_pinged_on_every_use() {
    let (engine, connector, connection) = connection();

    assert!(connection.client().await.is_ok());
    assert!(connection.client().await.is_ok());

    assert_eq!(connector.connects(), 1);
    assert_eq!(engine.count(|c| *c == Call::Version), 2);
}

#[tokio::test]
async fn failed_ping_discards_client() {
    let (engine, connector, connection) = connection();
    assert!(connection.is_reachable().await);

    engine.set_reachable(false);
    let err = connection.client().await.err().unwrap();
    assert!(err.is_connection());
    assert!(!connection.is_reachable().await);

    engine.set_reachable(true);
    assert!(connection.is_reachable().await);
    // Rebuilt after each failure: initial, after first failure, after second
    assert_eq!(connector.connects(), 3);
}

#[tokio::test]
async fn construction_failure_is_unreachable() {
    let (_engine, connector, connection) = connection();
    connector.set_failing(true);

    assert!(!connection.is_reachable().await);

    connector.set_failing(false);
    assert!(connection.is_reachable().await);
    assert_eq!(connector.connects(), 1);
}
