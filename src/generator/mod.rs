pub mod context;
pub mod intake;
pub mod outlet;
pub mod step_forward_agent;
pub mod workflow;
