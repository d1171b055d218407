pub mod archive;
pub mod command;
pub mod dump;
pub mod locker;
pub mod retention;

// Trait-based abstractions for testability
pub mod executor;

// Re-export commonly used types and traits (used by test crate)
pub use archive::{Archiver, ZipArchiver};
pub use dump::{DumpProducer, MysqlDumpProducer};
pub use executor::{CommandExecutor, RealExecutor};
