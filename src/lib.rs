pub mod captions;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod output;
pub mod run;
pub mod scoring;
