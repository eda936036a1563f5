//! Service Kit - Agent Tools
//!
//! Calculator tools implementing `agent_core::Tool`.

mod arithmetic;
mod sqrt;

pub use arithmetic::{ArithmeticTool, BinaryOperation};
pub use sqrt::SqrtTool;
