//! Client connections to the instance control socket
//!
//! `Connector` is the seam between the instance manager (which probes for
//! readiness) and the catalog driver (which queries the live session). The
//! production implementation speaks the MySQL protocol over the unix
//! socket through `sqlx`; the instance runs with grant checks disabled, so
//! no password is sent.

use std::path::Path;

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Connection, Executor, Row};
use thiserror::Error;

/// Connection or query failure on the control socket
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SessionError {
    message: String,
}

impl SessionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// A live client connection to a ready instance
#[allow(async_fn_in_trait)]
pub trait Session {
    /// Run the database-listing metadata query, one name per returned row
    async fn database_names(&mut self) -> Result<Vec<String>, SessionError>;

    /// Close the connection
    async fn close(self)
    where
        Self: Sized;
}

/// Opens sessions on a control socket
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Session: Session;

    async fn connect(&self, socket: &Path) -> Result<Self::Session, SessionError>;
}

/// MySQL-protocol connector over a unix socket
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    username: String,
}

impl MySqlConnector {
    pub fn new() -> Self {
        Self {
            username: "root".to_string(),
        }
    }
}

impl Default for MySqlConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for MySqlConnector {
    type Session = MySqlSession;

    async fn connect(&self, socket: &Path) -> Result<MySqlSession, SessionError> {
        let options = MySqlConnectOptions::new()
            .socket(socket)
            .username(&self.username);
        let conn = MySqlConnection::connect_with(&options).await?;
        Ok(MySqlSession { conn })
    }
}

/// Session backed by a `sqlx` MySQL connection
pub struct MySqlSession {
    conn: MySqlConnection,
}

impl Session for MySqlSession {
    async fn database_names(&mut self) -> Result<Vec<String>, SessionError> {
        // Plain string: sent as a text-protocol query, not a prepared statement
        let rows = (&mut self.conn).fetch_all("SHOW DATABASES").await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(SessionError::from))
            .collect()
    }

    async fn close(self) {
        let _ = self.conn.close().await;
    }
}
