pub mod classify;
pub mod config;
pub mod dataset;
pub mod llm;
pub mod mapping;
pub mod output;
pub mod pipeline;
pub mod recon;
pub mod report;
