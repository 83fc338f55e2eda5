//! Mid-level Intermediate Representation (MIR) for tempo
//!
//! The MIR sits between the typed AST and code generation. It is a flat,
//! named-result instruction form in which functions still nest lexically
//! until the closure conversion pass lifts them.

pub mod display;
pub mod ir;

pub use ir::*;
