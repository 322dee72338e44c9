/*!
Field- and path-sensitive taint propagation.

Data-flow facts are interned abstract memory locations: a base value plus a
chain of byte offsets describing the indirections taken from it. The value
lattice tracks, per fact, whether a sanitizer was seen on every path. The
analysis itself is an IDE problem solved by [`crate::analysis::IdeSolver`].
*/

pub mod analysis;
pub mod config;
pub mod edge_domain;
pub mod edge_function;
pub mod factory;
pub mod memory_location;

pub use analysis::{IdeTaintAnalysis, TaintReport};
pub use config::{CallTaintConfig, FunctionEffects, TaintConfig};
pub use edge_domain::EdgeDomain;
pub use edge_function::{EdgeFunction, EdgeFunctionCache};
pub use factory::MemoryLocationFactory;
pub use memory_location::{AbstractMemoryLocation, MemoryLocationData};
