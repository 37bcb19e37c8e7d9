//! One live PostgreSQL session with psycopg2-style transaction discipline.

use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config, NoTls, Row};
use tracing::{debug, error};
use whatif_error::{ErrorCode, ErrorContext, Result, WhatifError};

/// Owns exactly one connection; all statements issued through it run
/// strictly sequentially. Invalid after [`Session::close`].
pub struct Session {
    client: Option<Client>,
    driver: tokio::task::JoinHandle<()>,
    db_name: String,
    autocommit: bool,
}

impl Session {
    /// Open a session from a libpq-style connection string.
    ///
    /// A missing database name defaults to `postgres`. With `autocommit`
    /// off, a transaction is held open at all times: `commit`/`rollback`
    /// finish the current one and immediately begin the next.
    pub async fn connect(conninfo: &str, autocommit: bool) -> Result<Self> {
        let mut config: Config = conninfo.parse().map_err(|e| {
            WhatifError::new(
                ErrorCode::InvalidConnectionString,
                format!("could not parse connection string: {e}"),
            )
        })?;
        if config.get_dbname().is_none() {
            config.dbname("postgres");
        }
        let db_name = config
            .get_dbname()
            .unwrap_or("postgres")
            .to_string();

        let (client, connection) = config.connect(NoTls).await.map_err(|e| {
            WhatifError::new(
                ErrorCode::ConnectionFailed,
                format!("could not connect to {db_name}: {e}"),
            )
            .with_context(ErrorContext::Connection {
                database: db_name.clone(),
            })
        })?;

        let driver_db = db_name.clone();
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(database = %driver_db, "postgres connection error: {e}");
            }
        });

        let session = Self {
            client: Some(client),
            driver,
            db_name,
            autocommit,
        };
        if !autocommit {
            session.execute("BEGIN").await?;
        }
        debug!(database = %session.db_name, "database session created");
        Ok(session)
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    fn client(&self) -> Result<&Client> {
        self.client.as_ref().ok_or_else(|| {
            WhatifError::new(
                ErrorCode::ConnectionClosed,
                format!("session to {} is closed", self.db_name),
            )
            .with_context(ErrorContext::Connection {
                database: self.db_name.clone(),
            })
        })
    }

    /// Run a statement with no result expectation.
    pub async fn execute(&self, statement: &str) -> Result<()> {
        self.client()?
            .batch_execute(statement)
            .await
            .map_err(WhatifError::from)
    }

    /// Run a statement outside the implicit transaction (`analyze`, or DDL
    /// like `create database` that refuses to run in a transaction block):
    /// commit the open transaction first, then begin the next one afterwards.
    pub async fn execute_outside_transaction(&self, statement: &str) -> Result<()> {
        if self.autocommit {
            return self.execute(statement).await;
        }
        self.execute("COMMIT").await?;
        let outcome = self.execute(statement).await;
        self.execute("BEGIN").await?;
        outcome
    }

    /// Run a statement and return the first row, if any.
    ///
    /// A transient connectivity failure is logged and yields `None` rather
    /// than an error, so one hiccup cannot abort a long batch evaluation.
    /// Callers must treat an empty result as "unknown", not "zero".
    pub async fn fetch_one(&self, statement: &str) -> Result<Option<Row>> {
        Ok(self.fetch_all(statement).await?.into_iter().next())
    }

    /// Run a statement and return all rows, with the same transient-failure
    /// policy as [`Session::fetch_one`].
    pub async fn fetch_all(&self, statement: &str) -> Result<Vec<Row>> {
        match self.client()?.query(statement, &[]).await {
            Ok(rows) => Ok(rows),
            Err(e) => self.swallow_transient(e),
        }
    }

    /// Parameterized fetch of the first row; used for catalog lookups where
    /// the interpolated values are data, not schema.
    pub async fn query_one(
        &self,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>> {
        Ok(self.query_all(statement, params).await?.into_iter().next())
    }

    /// Parameterized fetch of all rows.
    pub async fn query_all(
        &self,
        statement: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>> {
        match self.client()?.query(statement, params).await {
            Ok(rows) => Ok(rows),
            Err(e) => self.swallow_transient(e),
        }
    }

    fn swallow_transient(&self, e: tokio_postgres::Error) -> Result<Vec<Row>> {
        let err = WhatifError::from(e);
        if err.is_transient() {
            error!(database = %self.db_name, %err, "transient fetch failure; returning empty result");
            Ok(Vec::new())
        } else {
            Err(err)
        }
    }

    /// Commit the open transaction and begin the next one.
    pub async fn commit(&self) -> Result<()> {
        if self.autocommit {
            return Ok(());
        }
        self.execute("COMMIT").await?;
        self.execute("BEGIN").await
    }

    /// Roll back the open transaction (clearing any error state) and begin
    /// the next one.
    pub async fn rollback(&self) -> Result<()> {
        if self.autocommit {
            return Ok(());
        }
        self.execute("ROLLBACK").await?;
        self.execute("BEGIN").await
    }

    /// Close the session. Every later operation fails with
    /// `ConnectionClosed`; any in-flight work is terminated hard.
    pub async fn close(&mut self) -> Result<()> {
        let client = self.client.take().ok_or_else(|| {
            WhatifError::new(
                ErrorCode::ConnectionClosed,
                format!("session to {} is already closed", self.db_name),
            )
        })?;
        drop(client);
        // The driver task finishes once the client side is gone.
        let _ = (&mut self.driver).await;
        debug!(database = %self.db_name, "database session closed");
        Ok(())
    }
}
