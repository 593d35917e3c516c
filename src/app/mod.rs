mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod types;


pub use orchestrator::PlantcamApp;
pub use types::{OnceReport, ShutdownReason};
