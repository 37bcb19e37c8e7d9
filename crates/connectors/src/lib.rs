//! # whatif-connectors
//!
//! Execution layer for physical-design what-if evaluation: given a candidate
//! index or partitioning scheme, report what a representative workload would
//! cost under that scheme without materializing it on real data.
//!
//! The crate provides:
//! - **Capability interface**: the [`DatabaseConnector`] trait every
//!   database-system adapter implements (`connector`).
//! - **PostgreSQL adapter**: hypothetical objects via hypopg, structured
//!   explain plans, `pg_stats` statistics (`postgres`).
//! - **Candidate model**: [`Index`], [`Partition`], [`Column`], [`Query`]
//!   descriptors exchanged with the selection algorithm (`models`).
//! - **Instrumentation**: per-connector counters and cumulative durations
//!   for each operation class (`instrumentation`).

pub mod connector;
pub mod instrumentation;
pub mod models;
pub mod plan;
pub mod postgres;
pub mod query;

pub use connector::DatabaseConnector;
pub use instrumentation::{Instrumentation, OpClass};
pub use models::{Column, ColumnStatistics, Index, Partition, Query, SimulatedIndexHandle};
pub use plan::PlanNode;
pub use postgres::PostgresConnector;
