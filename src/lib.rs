pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod publish;
pub mod reference;
pub mod snapshot;
pub mod stats;
pub mod xes;
