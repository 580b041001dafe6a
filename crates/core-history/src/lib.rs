//! History engine: the DAG-based undo/redo/branching engine sitting on top
//! of `core-model`'s pure state and `core-command`'s command algebra.

pub mod engine;
pub mod engine_io;
pub mod engine_resolve;
pub mod error;
pub mod graph;
pub mod retention;
pub mod transaction;

pub use engine::{Clock, ErrorSink, HistoryEngine, SystemClock, Telemetry, ThumbnailProvider};
pub use error::HistoryError;
pub use graph::{Commit, GraphDelta, Head, HistoryGraph, Protected, MAIN_BRANCH};
pub use retention::RetentionPolicy;
pub use transaction::TransactionStack;
