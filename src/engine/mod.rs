//! Engine module: the collaborators the pipeline drives (transport, storage, decoding, item
//! source), plus CLI plumbing.

pub mod arg_parser;
pub mod cli;
pub mod decode;
pub mod http;
pub mod progress;
pub mod source;
pub mod storage;

// Re-export commonly used items
pub use arg_parser::Cli;
pub use cli::handle_run;
pub use decode::{Decoder, ImageDecoder, RawDecoder};
pub use http::{FetchResponse, Fetcher, HttpFetcher};
pub use source::load_descriptors;
pub use storage::{ArtifactHandle, ArtifactStore, sanitize_component};
