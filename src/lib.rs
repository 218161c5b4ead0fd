pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod llm;
pub mod notion;
pub mod telegram;
pub mod transcription;

// Re-export commonly used types
pub use config::Config;
pub use generator::intake::orchestrator::IntakeOrchestrator;
pub use generator::intake::run_workflow;
pub use generator::workflow::launch;
