pub mod distribution;
pub mod reports;
pub mod seeds;
pub mod simulation;
pub mod tester;

pub use distribution::{DistributionReport, run_distribution, validate_distribution};
pub use seeds::resolve_seed_inputs;
pub use simulation::{GatewayTarget, SimulationPlan, SimulationSummary, Step};
pub use tester::*;
