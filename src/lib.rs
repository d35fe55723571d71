pub mod cache;
pub mod config;
pub mod context;
pub mod index;
pub mod interrupt;
pub mod kernel;
pub mod matcher;
pub mod pipeline;
pub mod solver;
pub mod substitution;

#[cfg(test)]
mod tests;
