//! Command implementations

pub mod bow;
pub mod metrology;
