pub mod delegate;
pub mod engine;
