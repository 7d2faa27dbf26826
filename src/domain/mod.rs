//! Domain Layer - Core types for the pairs pipeline
//!
//! Pure data types with no I/O. Price history arrives here already loaded;
//! all external interactions happen through the ports layer.

pub mod cancellation;
pub mod candidate;
pub mod failure;
pub mod position;
pub mod price_matrix;

pub use cancellation::CancellationToken;
pub use candidate::{PairCandidate, PairKey};
pub use failure::{PairError, PairFailure, PipelineStage};
pub use position::Position;
pub use price_matrix::{AlignedPair, DataError, PriceMatrix, RawColumn, RawPriceMatrix};
