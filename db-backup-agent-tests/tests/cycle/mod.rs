//! Backup cycle tests for db-backup-agent
//!
//! These tests run full cycles against a temp dir with fake dump producers
//! and notification sinks. No database or network is needed.

mod failures;
mod scheduler;
