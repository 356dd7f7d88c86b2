mod executor;

pub use executor::{ParallelBuildError, ParallelTreeBuilder};
