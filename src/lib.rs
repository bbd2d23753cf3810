pub mod checkout;
pub mod cli;
pub mod config;
pub mod extractor;
pub mod heuristics;
pub mod model;
pub mod util;
