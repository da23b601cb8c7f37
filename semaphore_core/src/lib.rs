// semaphore_core/src/lib.rs

// This file defines the public modules of the library.
pub mod config;
pub mod debounce;
pub mod error;
pub mod geometry;
pub mod path;
pub mod pipeline;
pub mod prelude;
pub mod projection;
pub mod scanner;
pub mod types;
