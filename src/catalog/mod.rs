//! Database catalog and logical dumps
//!
//! Once the instance is ready: list every database it can see, narrow the
//! list with glob patterns, and dump each selected database to its own
//! compressed file.

mod dump;
mod errors;
mod filter;

pub use dump::{Dumper, OUTPUT_EXTENSION};
pub use errors::{CatalogError, CatalogResult};
pub use filter::{compile, filter};

use std::collections::BTreeSet;

use crate::instance::Session;
use crate::observability::{Event, Logger};

/// Distinct database names visible on the instance
pub async fn list_databases<S: Session>(
    session: &mut S,
    logger: &Logger,
) -> CatalogResult<BTreeSet<String>> {
    let rows = session.database_names().await.map_err(CatalogError::Query)?;
    let row_count = rows.len();
    let databases: BTreeSet<String> = rows.into_iter().collect();

    logger.info(
        Event::CatalogListed,
        &[
            ("databases", &databases.len().to_string()),
            ("rows", &row_count.to_string()),
        ],
    );
    Ok(databases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::SessionError;

    struct RowsSession(Result<Vec<String>, String>);

    impl Session for RowsSession {
        async fn database_names(&mut self) -> Result<Vec<String>, SessionError> {
            self.0.clone().map_err(SessionError::new)
        }

        async fn close(self) {}
    }

    #[tokio::test]
    async fn test_list_collapses_duplicates() {
        let logger = Logger::capture();
        let mut session = RowsSession(Ok(vec![
            "sys".to_string(),
            "app".to_string(),
            "sys".to_string(),
        ]));

        let dbs = list_databases(&mut session, &logger).await.unwrap();
        assert_eq!(dbs.len(), 2);
        assert!(dbs.contains("app") && dbs.contains("sys"));
        assert!(logger.captured()[0].contains("\"rows\":\"3\""));
    }

    #[tokio::test]
    async fn test_list_query_failure() {
        let logger = Logger::capture();
        let mut session = RowsSession(Err("server has gone away".to_string()));

        let err = list_databases(&mut session, &logger).await.unwrap_err();
        assert_eq!(err.code(), "B2S_CATALOG_QUERY");
        assert!(err.to_string().contains("server has gone away"));
    }
}
