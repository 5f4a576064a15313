//! backup2sql - convert a physical MySQL backup archive into logical SQL dumps
//!
//! Extracts the archive into a workspace, replays the storage-engine log,
//! boots a throwaway read-only server against it and dumps each selected
//! database to `<database>.sql.bz2`.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod extract;
pub mod identity;
pub mod instance;
pub mod observability;
pub mod pipeline;
pub mod process;
pub mod recovery;
pub mod workspace;
