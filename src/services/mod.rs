pub mod library;
pub mod stats;
