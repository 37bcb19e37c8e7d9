//! The capability interface every database-system adapter must satisfy.

use async_trait::async_trait;
use whatif_error::Result;

use crate::instrumentation::Instrumentation;
use crate::models::{Column, Index, Partition, Query, SimulatedIndexHandle};
use crate::plan::PlanNode;

/// Required operations of a what-if evaluation adapter.
///
/// Every operation is required: an adapter that cannot express one fails to
/// compile instead of failing at call time. Adapters whose backend lacks a
/// capability at runtime return `ErrorCode::NotImplemented` explicitly,
/// never a silent no-op.
///
/// All session-touching methods take `&mut self`: one connector owns one
/// session and its operations are strictly sequential.
#[async_trait]
pub trait DatabaseConnector: Send {
    /// Invocation counters and cumulative durations for this instance.
    fn instrumentation(&self) -> &Instrumentation;

    /// Install/enable the backend's hypothetical-object extension.
    async fn enable_simulation(&mut self) -> Result<()>;

    /// Declare a hypothetical index; the returned handle is required to drop
    /// it again and is never shared by two concurrently-live indexes.
    async fn simulate_index(&mut self, index: &Index) -> Result<SimulatedIndexHandle>;

    /// Drop a hypothetical index. A backend refusal is fatal: a surviving
    /// phantom index would corrupt every subsequent cost measurement.
    async fn drop_simulated_index(&mut self, handle: SimulatedIndexHandle) -> Result<()>;

    /// Declare hypothetical range partitioning split at the column's median.
    /// Requires the partition column's statistics to be populated.
    async fn simulate_partition(&mut self, partition: &Partition) -> Result<()>;

    /// Drop the hypothetical partitioning of one table; fatal when no
    /// matching table is live.
    async fn drop_simulated_partition(
        &mut self,
        table_name: &str,
        partition: &Partition,
    ) -> Result<()>;

    /// Clear every hypothetical partition in one call (bulk cleanup between
    /// evaluation rounds).
    async fn reset_simulated_partitions(&mut self) -> Result<()>;

    /// Scalar cost of the query's plan-only estimate.
    async fn get_cost(&mut self, query: &Query) -> Result<f64>;

    /// Plan-only (non-executing) estimate for the query.
    async fn get_plan(&mut self, query: &Query) -> Result<PlanNode>;

    /// Execute the query under an optional statement timeout and return the
    /// measured time with the captured plan; execution failures fall back to
    /// `(None, plan-only estimate)` instead of aborting the batch.
    async fn exec_query(
        &mut self,
        query: &Query,
        timeout_ms: Option<u64>,
        cost_evaluation: bool,
    ) -> Result<(Option<f64>, PlanNode)>;

    /// Fetch and cache the column's declared type from catalog metadata.
    async fn resolve_column_type(&mut self, column: &mut Column) -> Result<String>;

    /// Populate min/median/max statistics for the partition's column from
    /// catalog distribution statistics.
    async fn populate_statistics(&mut self, partition: &mut Partition) -> Result<()>;

    /// Decile cut points of the column's live value distribution.
    async fn column_percentiles(&mut self, column: &Column) -> Result<Vec<String>>;

    /// Really create the index and record its size in bytes.
    async fn create_index(&mut self, index: &mut Index) -> Result<()>;

    /// Drop a really-created index.
    async fn drop_index(&mut self, index: &Index) -> Result<()>;

    /// Drop every user index.
    async fn drop_all_indexes(&mut self) -> Result<()>;

    /// Combined size of all user indexes, in bytes.
    async fn indexes_size(&mut self) -> Result<u64>;

    /// Number of user indexes.
    async fn index_count(&mut self) -> Result<u64>;

    async fn table_exists(&mut self, table_name: &str) -> Result<bool>;

    async fn database_exists(&mut self, database_name: &str) -> Result<bool>;

    async fn database_names(&mut self) -> Result<Vec<String>>;

    async fn create_database(&mut self, database_name: &str) -> Result<()>;

    async fn drop_database(&mut self, database_name: &str) -> Result<()>;

    /// Refresh the backend's optimizer statistics for the whole database.
    async fn create_statistics(&mut self) -> Result<()>;

    /// Pin the backend's random source for reproducible sampling.
    async fn set_random_seed(&mut self, seed: f64) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    /// Hard, unrecoverable termination of the session.
    async fn close(&mut self) -> Result<()>;
}
