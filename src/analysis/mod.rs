pub mod aggregate;
pub mod assembler;
pub mod batcher;
pub mod fetcher;
pub mod vibe;


pub use aggregate::*;
pub use assembler::*;
pub use batcher::*;
pub use fetcher::*;
pub use vibe::*;
