//! End-to-end checks against a live PostgreSQL server with the hypopg
//! extension installed. Ignored by default; set `WHATIF_TEST_DSN` (e.g.
//! `host=localhost user=postgres dbname=whatif_test`) and run with
//! `cargo test -- --ignored`.

use whatif_connectors::{Column, DatabaseConnector, Index, Partition, PostgresConnector, Query};

fn dsn() -> String {
    std::env::var("WHATIF_TEST_DSN").expect("WHATIF_TEST_DSN must point at a test server")
}

/// Connects and (re)creates the small fixture table the tests query.
async fn connector_with_fixture() -> anyhow::Result<PostgresConnector> {
    let (client, connection) = tokio_postgres::connect(&dsn(), tokio_postgres::NoTls).await?;
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client
        .batch_execute(
            "drop table if exists whatif_fixture;
             create table whatif_fixture (id int, payload text);
             insert into whatif_fixture
                 select i, 'payload_' || (i % 97) from generate_series(1, 10000) i;
             analyze whatif_fixture;",
        )
        .await?;

    let mut connector = PostgresConnector::connect(&dsn(), false).await?;
    let warmup = Query::new(0, "select 1");
    connector.exec_query(&warmup, None, false).await?;
    Ok(connector)
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL server with hypopg"]
async fn test_simulate_then_drop_counts_once_and_removes_benefit() -> anyhow::Result<()> {
    let mut connector = connector_with_fixture().await?;
    if connector.enable_simulation().await.is_err() {
        // Already installed: clear the aborted transaction the failed
        // `create extension` left behind.
        connector.rollback().await?;
    }

    let index = Index::new("whatif_fixture", vec!["payload".to_string()]);
    let query = Query::new(1, "select * from whatif_fixture where payload = 'x'");

    let base_cost = connector.get_cost(&query).await?;

    let handle = connector.simulate_index(&index).await?;
    assert_eq!(connector.instrumentation().index_simulations(), 1);

    connector.drop_simulated_index(handle).await?;
    assert_eq!(connector.instrumentation().index_simulations(), 1);

    let cost_after_drop = connector.get_cost(&query).await?;
    assert_eq!(base_cost, cost_after_drop);

    connector.close().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL server with hypopg"]
async fn test_timeout_falls_back_to_plan_only() -> anyhow::Result<()> {
    let mut connector = connector_with_fixture().await?;

    let runaway = Query::new(2, "select count(*) from generate_series(1, 200000000)");
    let (timing, plan) = connector.exec_query(&runaway, Some(1), false).await?;
    assert!(timing.is_none());
    assert!(plan.total_cost > 0.0);

    // The timeout must not leak into the next evaluation.
    let quick = Query::new(3, "select 1");
    let (timing, _plan) = connector.exec_query(&quick, None, false).await?;
    assert!(timing.is_some());

    connector.close().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL server with hypopg"]
async fn test_timeout_reset_even_when_fallback_fails() -> anyhow::Result<()> {
    let mut connector = connector_with_fixture().await?;

    // Fails under analyze and under the plan-only fallback alike.
    let broken = Query::new(4, "select * from whatif_missing_table");
    let result = connector.exec_query(&broken, Some(1), false).await;
    assert!(result.is_err());

    // Were the 1ms timeout still in force, this would fall back to a
    // plan-only estimate and report no timing.
    let follow_up = Query::new(5, "select count(*) from whatif_fixture");
    let (timing, _plan) = connector.exec_query(&follow_up, None, false).await?;
    assert!(timing.is_some());

    connector.close().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL server with hypopg"]
async fn test_create_statistics_refreshes_distributions() -> anyhow::Result<()> {
    let mut connector = connector_with_fixture().await?;

    // Runs outside the implicit transaction the connector otherwise holds
    // open, so fresh distributions are visible immediately.
    connector.create_statistics().await?;

    let mut partition = Partition::new("whatif_fixture", Column::new("whatif_fixture", "id"));
    connector.populate_statistics(&mut partition).await?;
    assert!(partition.column.statistics.is_some());

    connector.close().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL server with hypopg"]
async fn test_drop_without_simulate_is_fatal() -> anyhow::Result<()> {
    let mut connector = connector_with_fixture().await?;

    let mut partition = Partition::new("whatif_fixture", Column::new("whatif_fixture", "id"));
    connector.populate_statistics(&mut partition).await?;

    let err = connector
        .drop_simulated_partition("whatif_fixture", &partition)
        .await
        .expect_err("dropping with no live hypothetical partition must fail");
    assert!(err.is_fatal());

    connector.close().await?;
    Ok(())
}
