#![allow(async_fn_in_trait)]
pub mod args;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod input;
pub mod job_runner;
pub mod run;
pub mod settings;
pub mod up42;
pub mod workflow;

#[cfg(test)]
mod testing;
