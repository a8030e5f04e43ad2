pub mod dashboard;
pub mod eta;
pub mod notifier;
pub mod scoring;
