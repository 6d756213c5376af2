pub mod heap;
pub mod marker;
pub mod sweeper;
pub mod trace;

pub use heap::{CollectStats, Heap, HeapStats};
pub use trace::{Trace, Tracer};
