//! hitshape-io: asset loading, extraction caching and vertex persistence.
//!
//! Everything that touches the filesystem, a clock, or an async runtime
//! lives here; the geometry stays in `hitshape-pipeline`.

pub mod extractor;
pub mod source;
pub mod vertex_store;

pub use extractor::{DEFAULT_LOAD_TIMEOUT, Extractor};
pub use source::{AssetSource, FsSource, LoadError, MemorySource};
pub use vertex_store::{StoreError, VertexStore};
