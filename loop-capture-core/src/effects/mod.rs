pub mod chain;
pub mod preset;
