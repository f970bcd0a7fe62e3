pub mod memory;
pub mod traits;

pub use memory::MemoryBackend;
pub use traits::{Backend, FetchQuery, FetchResult, JoinFilter};
