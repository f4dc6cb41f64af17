pub mod cli;
pub mod client;
pub mod command;
pub mod errors;
pub mod launcher;
pub mod mockserver;
pub mod repl;
pub mod telemetry;
pub mod topology;
