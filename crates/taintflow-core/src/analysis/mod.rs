/*! Program analyses and the IDE solver scaffolding the taint engine runs on. */

pub mod alias;
pub mod dominator;
pub mod icfg;
pub mod ide;
pub mod ordering;
pub mod solver;

pub use alias::{AliasInfo, AliasResult, ExplicitAliasInfo};
pub use dominator::DominatorTree;
pub use icfg::{InterproceduralCfg, ModuleCfg};
pub use ide::{FlowFunction, IdeProblem, SolverResults};
pub use ordering::BasicBlockOrdering;
pub use solver::IdeSolver;
