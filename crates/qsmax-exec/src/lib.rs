//! Execution front-end for the qsmax softmax node
//!
//! [`QuantSoftmaxNode`] owns the kernel configuration and the tensor
//! shape; [`backend`] holds the three ways to realize it.

pub mod artifact;
pub mod backend;
pub mod model;
pub mod node;

pub use artifact::{BuildManifest, NodeConfig};
pub use backend::{
    backend_for, drive_simulation, select_backend, CompiledNumericBackend, CycleAccurateBackend,
    EstimateBackend, ExecutionBackend, ExecutionOutput, RtlSimulator, SimulationRun,
};
pub use model::run_node_model;
pub use node::QuantSoftmaxNode;
