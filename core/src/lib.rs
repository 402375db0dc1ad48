pub mod action;
mod assets;
pub mod compile;
pub mod config;
pub mod interactive;
pub mod orchestrator;
pub mod report;
pub mod scaffold;
pub mod storage;
pub mod style;
pub mod template;
pub mod testing;

#[cfg(test)]
mod testutil;

pub use crate::config::Config;
