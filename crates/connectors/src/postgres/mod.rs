//! PostgreSQL adapter: hypothetical objects via the hypopg extension,
//! plans via `EXPLAIN (FORMAT JSON)`, statistics via `pg_stats`.

pub mod rewrite;
pub mod session;
pub mod stats;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use whatif_error::{ErrorCode, ErrorContext, Result, WhatifError};

use crate::connector::DatabaseConnector;
use crate::instrumentation::{Instrumentation, OpClass};
use crate::models::{Column, Index, Partition, Query, SimulatedIndexHandle};
use crate::plan::PlanNode;
use crate::query;
use session::Session;

/// Seed applied at construction so repeated evaluation rounds see the same
/// sampling decisions.
const DEFAULT_RANDOM_SEED: f64 = 0.17;

pub struct PostgresConnector {
    session: Session,
    instrumentation: Instrumentation,
}

impl PostgresConnector {
    /// Open a connector from a libpq-style connection string.
    ///
    /// Plan stability settings (`max_parallel_workers_per_gather = 0`,
    /// `enable_bitmapscan` off) and the default random seed are applied
    /// immediately so cost figures are comparable across calls.
    pub async fn connect(conninfo: &str, autocommit: bool) -> Result<Self> {
        let session = Session::connect(conninfo, autocommit).await?;
        let connector = Self {
            session,
            instrumentation: Instrumentation::default(),
        };

        connector
            .session
            .execute("set max_parallel_workers_per_gather = 0")
            .await?;
        connector.session.execute("set enable_bitmapscan to off").await?;
        connector
            .session
            .execute(&format!("select setseed({DEFAULT_RANDOM_SEED})"))
            .await?;

        debug!(database = %connector.session.db_name(), "postgres connector created");
        Ok(connector)
    }

    pub fn db_name(&self) -> &str {
        self.session.db_name()
    }

    /// Full untyped explain document, for callers that want every per-node
    /// property the backend reports.
    pub async fn raw_plan(&mut self, query: &Query) -> Result<Value> {
        let text = self.prepare_query(query).await?;
        let statement = format!("explain (format json) {text}");
        let document = self.fetch_explain_document(&statement).await;
        self.cleanup_query(query).await?;
        document
    }

    /// Prepare state: run auxiliary view definitions (each failure tolerated
    /// and logged independently) and return the rewritten terminal select.
    async fn prepare_query(&self, query: &Query) -> Result<String> {
        for statement in query::view_statements(&query.text) {
            if let Err(e) = self.session.execute(statement).await {
                error!(query_id = query.id, %e, "auxiliary view creation failed");
            }
        }
        match query::terminal_select(&query.text) {
            Some(select) => Ok(rewrite::rewrite_query_text(select)),
            None => Err(WhatifError::new(
                ErrorCode::MissingSelect,
                format!("workload query {} has no terminal select statement", query.id),
            )
            .with_context(ErrorContext::Query { query_id: query.id })),
        }
    }

    /// Cleanup state: drop the auxiliary views named in the original text and
    /// commit. Runs on success and failure paths alike, so failed queries
    /// never leave stray schema objects behind.
    async fn cleanup_query(&self, query: &Query) -> Result<()> {
        for statement in query::drop_view_statements(&query.text) {
            if let Err(e) = self.session.execute(statement).await {
                warn!(query_id = query.id, %e, "auxiliary view cleanup failed");
                // Clear the aborted-transaction state so later statements run.
                self.session.rollback().await?;
            }
        }
        self.session.commit().await
    }

    async fn fetch_explain_document(&self, statement: &str) -> Result<Value> {
        let row = self.session.fetch_one(statement).await?.ok_or_else(|| {
            WhatifError::new(ErrorCode::PlanUnavailable, "explain returned no rows")
        })?;
        row.try_get(0).map_err(WhatifError::from)
    }

    async fn explain(&self, statement: &str) -> Result<PlanNode> {
        let document = self.fetch_explain_document(statement).await?;
        PlanNode::from_explain_document(&document)
    }

    /// Plan-only estimate: Prepare, `explain (format json)`, Cleanup.
    async fn plan_without_execution(&self, query: &Query) -> Result<PlanNode> {
        let text = self.prepare_query(query).await?;
        let statement = format!("explain (format json) {text}");
        let plan = self.explain(&statement).await;
        self.cleanup_query(query).await?;
        plan.map_err(|e| {
            if e.context.is_none() {
                e.with_context(ErrorContext::Query { query_id: query.id })
            } else {
                e
            }
        })
    }
}

#[async_trait]
impl DatabaseConnector for PostgresConnector {
    fn instrumentation(&self) -> &Instrumentation {
        &self.instrumentation
    }

    async fn enable_simulation(&mut self) -> Result<()> {
        self.session
            .execute("create extension hypopg")
            .await
            .map_err(|e| {
                e.with_hint("install the hypopg extension on the server before enabling simulation")
            })?;
        self.session.commit().await
    }

    async fn simulate_index(&mut self, index: &Index) -> Result<SimulatedIndexHandle> {
        let _timer = self.instrumentation.invocation(OpClass::IndexSimulation);

        let statement = format!(
            "select * from hypopg_create_index('create index on {} ({})')",
            index.table,
            index.joined_column_names()
        );
        let row = self.session.fetch_one(&statement).await?.ok_or_else(|| {
            WhatifError::new(
                ErrorCode::SimulationUnavailable,
                format!("hypothetical index creation returned nothing for {index}"),
            )
            .with_context(ErrorContext::Simulation {
                table: Some(index.table.clone()),
                handle: None,
            })
            .with_hint("run enable_simulation() once per session")
        })?;

        let oid: u32 = row.try_get(0).map_err(WhatifError::from)?;
        Ok(SimulatedIndexHandle::new(oid))
    }

    async fn drop_simulated_index(&mut self, handle: SimulatedIndexHandle) -> Result<()> {
        let _timer = self.instrumentation.timer(OpClass::IndexSimulation);

        let row = self
            .session
            .query_one("select * from hypopg_drop_index($1)", &[&handle.as_oid()])
            .await?;
        let dropped = match row {
            Some(row) => row.try_get::<_, bool>(0).map_err(WhatifError::from)?,
            None => false,
        };
        if !dropped {
            return Err(WhatifError::new(
                ErrorCode::SimulationIntegrity,
                format!("could not drop simulated index with handle {handle}"),
            )
            .with_context(ErrorContext::Simulation {
                table: None,
                handle: Some(handle.to_string()),
            })
            .with_hint("the handle must come verbatim from a prior simulate_index call"));
        }
        Ok(())
    }

    async fn simulate_partition(&mut self, partition: &Partition) -> Result<()> {
        let _timer = self.instrumentation.invocation(OpClass::PartitionSimulation);

        let statistics = partition.column.statistics.as_ref().ok_or_else(|| {
            WhatifError::new(
                ErrorCode::StatisticsMissing,
                format!("column {} has no statistics", partition.column),
            )
            .with_context(ErrorContext::Statistics {
                table: partition.column.table.clone(),
                column: partition.column.name.clone(),
            })
            .with_hint("call populate_statistics() before simulating the partition")
        })?;

        let (minimum, median, maximum) = if partition.column.is_text_or_date() {
            (
                stats::quote_boundary(&statistics.minimum),
                stats::quote_boundary(&statistics.median),
                stats::quote_boundary(&statistics.maximum),
            )
        } else {
            (
                statistics.minimum.clone(),
                statistics.median.clone(),
                statistics.maximum.clone(),
            )
        };

        let table = &partition.table;
        let column = &partition.column.name;
        let declare = format!(
            "select hypopg_partition_table('{table}', 'PARTITION BY RANGE ({column})')"
        );
        let lower = format!(
            "select hypopg_add_partition('hypo_part_range_{table}_1', \
             'PARTITION OF {table} FOR VALUES FROM ({minimum}) TO ({median})')"
        );
        let upper = format!(
            "select hypopg_add_partition('hypo_part_range_{table}_2', \
             'PARTITION OF {table} FOR VALUES FROM ({median}) TO ({maximum})')"
        );

        info!(%declare);
        info!(%lower);
        info!(%upper);

        let declared = self.session.fetch_one(&declare).await?;
        if declared.is_none() {
            return Err(WhatifError::new(
                ErrorCode::SimulationUnavailable,
                format!("hypothetical partitioning returned nothing for {partition}"),
            )
            .with_context(ErrorContext::Simulation {
                table: Some(table.clone()),
                handle: None,
            }));
        }
        self.session.fetch_one(&lower).await?;
        self.session.fetch_one(&upper).await?;
        Ok(())
    }

    async fn drop_simulated_partition(
        &mut self,
        table_name: &str,
        partition: &Partition,
    ) -> Result<()> {
        let _timer = self.instrumentation.timer(OpClass::PartitionSimulation);

        let rows = self
            .session
            .query_all(
                "select hypopg_drop_table(relid) from hypopg_table() where tablename = $1",
                &[&table_name],
            )
            .await?;
        if rows.is_empty() {
            return Err(WhatifError::new(
                ErrorCode::SimulationIntegrity,
                format!(
                    "no live hypothetical partitioning for table {table_name} (column {})",
                    partition.column
                ),
            )
            .with_context(ErrorContext::Simulation {
                table: Some(table_name.to_string()),
                handle: None,
            })
            .with_hint("the matching simulate_partition call was never made or already cleaned up"));
        }
        Ok(())
    }

    async fn reset_simulated_partitions(&mut self) -> Result<()> {
        let _timer = self.instrumentation.timer(OpClass::PartitionSimulation);
        info!("resetting all hypothetical partitions");
        self.session.fetch_all("select hypopg_reset_table()").await?;
        Ok(())
    }

    async fn get_cost(&mut self, query: &Query) -> Result<f64> {
        let _timer = self.instrumentation.invocation(OpClass::CostEstimation);
        let plan = self.plan_without_execution(query).await?;
        Ok(plan.total_cost)
    }

    async fn get_plan(&mut self, query: &Query) -> Result<PlanNode> {
        let _timer = self.instrumentation.invocation(OpClass::CostEstimation);
        self.plan_without_execution(query).await
    }

    async fn exec_query(
        &mut self,
        query: &Query,
        timeout_ms: Option<u64>,
        cost_evaluation: bool,
    ) -> Result<(Option<f64>, PlanNode)> {
        // Committing up front so a timeout-induced rollback cannot destroy
        // simulated indexes held by the open transaction.
        if !cost_evaluation {
            self.session.commit().await?;
        }

        let text = self.prepare_query(query).await?;
        if let Some(ms) = timeout_ms {
            self.session
                .execute(&format!("set statement_timeout = {ms}"))
                .await?;
        }

        let statement = format!("explain (analyze, buffers, format json) {text}");
        let outcome = match self.explain(&statement).await {
            Ok(plan) => Ok((plan.actual_total_time, plan)),
            Err(e) => {
                error!(query_id = query.id, %e, "workload query failed; falling back to plan-only estimate");
                match self.session.rollback().await {
                    Ok(()) => self
                        .plan_without_execution(query)
                        .await
                        .map(|plan| (None, plan)),
                    Err(e) => Err(e),
                }
            }
        };

        // Unconditional, even when the fallback estimate failed too: the
        // timeout must never leak into the next query.
        self.session.execute("set statement_timeout = 0").await?;
        self.cleanup_query(query).await?;
        outcome
    }

    async fn resolve_column_type(&mut self, column: &mut Column) -> Result<String> {
        if let Some(ty) = &column.data_type {
            return Ok(ty.clone());
        }
        let row = self
            .session
            .query_one(
                "select data_type from information_schema.columns \
                 where table_name = $1 and column_name = $2",
                &[&column.table, &column.name],
            )
            .await?
            .ok_or_else(|| {
                WhatifError::new(
                    ErrorCode::TypeUnresolved,
                    format!("no catalog type for column {column}"),
                )
                .with_context(ErrorContext::Statistics {
                    table: column.table.clone(),
                    column: column.name.clone(),
                })
            })?;
        let data_type: String = row.try_get(0).map_err(WhatifError::from)?;
        column.data_type = Some(data_type.clone());
        Ok(data_type)
    }

    async fn populate_statistics(&mut self, partition: &mut Partition) -> Result<()> {
        info!(partition = %partition, "fetching column statistics");
        self.resolve_column_type(&mut partition.column).await?;

        let row = self
            .session
            .query_one(
                "select most_common_vals::text, histogram_bounds::text from pg_stats \
                 where tablename = $1 and attname = $2",
                &[&partition.column.table, &partition.column.name],
            )
            .await?
            .ok_or_else(|| missing_statistics(&partition.column))?;

        let most_common: Option<String> = row.try_get(0).map_err(WhatifError::from)?;
        let histogram: Option<String> = row.try_get(1).map_err(WhatifError::from)?;

        let statistics = match histogram {
            Some(bounds) => stats::summarize_histogram(&stats::parse_array_literal(&bounds)),
            None => stats::summarize_most_common(stats::parse_array_literal(
                most_common.as_deref().unwrap_or("{}"),
            )),
        }
        .ok_or_else(|| missing_statistics(&partition.column))?;

        partition.column.statistics = Some(statistics);
        info!(column = %partition.column, "column statistics retrieved");
        Ok(())
    }

    async fn column_percentiles(&mut self, column: &Column) -> Result<Vec<String>> {
        let ident = stats::quote_identifier(&column.name);
        let statement = format!(
            "select max({ident})::text from \
             (select {ident}, ntile(10) over (order by {ident}) as percentile from {}) as p \
             group by percentile order by percentile",
            column.table
        );
        let rows = self.session.fetch_all(&statement).await?;
        rows.into_iter()
            .map(|row| row.try_get(0).map_err(WhatifError::from))
            .collect()
    }

    async fn create_index(&mut self, index: &mut Index) -> Result<()> {
        let statement = format!(
            "create index {} on {} ({})",
            index.physical_name(),
            index.table,
            index.joined_column_names()
        );
        self.session.execute(&statement).await?;

        let row = self
            .session
            .query_one(
                "select relpages from pg_class where relname = $1",
                &[&index.physical_name()],
            )
            .await?;
        if let Some(row) = row {
            let pages: i32 = row.try_get(0).map_err(WhatifError::from)?;
            index.estimated_size = Some(pages as u64 * 8 * 1024);
        }
        Ok(())
    }

    async fn drop_index(&mut self, index: &Index) -> Result<()> {
        self.session
            .execute(&format!("drop index {}", index.physical_name()))
            .await
    }

    async fn drop_all_indexes(&mut self) -> Result<()> {
        info!("dropping all user indexes");
        let rows = self
            .session
            .fetch_all("select indexname from pg_indexes where schemaname = 'public'")
            .await?;
        for row in rows {
            let name: String = row.try_get(0).map_err(WhatifError::from)?;
            debug!(index = %name, "dropping index");
            self.session.execute(&format!("drop index {name}")).await?;
        }
        Ok(())
    }

    async fn indexes_size(&mut self) -> Result<u64> {
        let statement = "select coalesce(sum(pg_indexes_size(table_name::text)), 0)::bigint \
                         from (select table_name from information_schema.tables \
                         where table_schema = 'public') as all_tables";
        let row = self.session.fetch_one(statement).await?;
        match row {
            Some(row) => {
                let bytes: i64 = row.try_get(0).map_err(WhatifError::from)?;
                Ok(bytes.max(0) as u64)
            }
            None => Ok(0),
        }
    }

    async fn index_count(&mut self) -> Result<u64> {
        let row = self
            .session
            .fetch_one("select count(*) from pg_indexes where schemaname = 'public'")
            .await?;
        match row {
            Some(row) => {
                let count: i64 = row.try_get(0).map_err(WhatifError::from)?;
                Ok(count.max(0) as u64)
            }
            None => Ok(0),
        }
    }

    async fn table_exists(&mut self, table_name: &str) -> Result<bool> {
        let row = self
            .session
            .query_one(
                "select exists (select 1 from pg_tables where tablename = $1)",
                &[&table_name],
            )
            .await?;
        match row {
            Some(row) => row.try_get(0).map_err(WhatifError::from),
            None => Ok(false),
        }
    }

    async fn database_exists(&mut self, database_name: &str) -> Result<bool> {
        let row = self
            .session
            .query_one(
                "select exists (select 1 from pg_database where datname = $1)",
                &[&database_name],
            )
            .await?;
        match row {
            Some(row) => row.try_get(0).map_err(WhatifError::from),
            None => Ok(false),
        }
    }

    async fn database_names(&mut self) -> Result<Vec<String>> {
        let rows = self.session.fetch_all("select datname from pg_database").await?;
        rows.into_iter()
            .map(|row| row.try_get(0).map_err(WhatifError::from))
            .collect()
    }

    async fn create_database(&mut self, database_name: &str) -> Result<()> {
        self.session
            .execute_outside_transaction(&format!("create database {database_name}"))
            .await?;
        info!(database = %database_name, "database created");
        Ok(())
    }

    async fn drop_database(&mut self, database_name: &str) -> Result<()> {
        self.session
            .execute_outside_transaction(&format!("drop database {database_name}"))
            .await?;
        info!(database = %database_name, "database dropped");
        Ok(())
    }

    async fn create_statistics(&mut self) -> Result<()> {
        info!("postgres: running analyze");
        self.session.execute_outside_transaction("analyze").await
    }

    async fn set_random_seed(&mut self, seed: f64) -> Result<()> {
        info!(seed, "postgres: setting random seed");
        self.session
            .execute(&format!("select setseed({seed})"))
            .await
    }

    async fn commit(&mut self) -> Result<()> {
        self.session.commit().await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.session.rollback().await
    }

    async fn close(&mut self) -> Result<()> {
        self.session.close().await
    }
}

fn missing_statistics(column: &Column) -> WhatifError {
    WhatifError::new(
        ErrorCode::StatisticsUnavailable,
        format!("no distribution statistics for column {column}"),
    )
    .with_context(ErrorContext::Statistics {
        table: column.table.clone(),
        column: column.name.clone(),
    })
    .with_hint("run create_statistics() so the catalog has an analyzed distribution")
}
