//! Search request resolution.
//!
//! # Responsibility
//! - Turn a one-of-four search criterion into a single store predicate.
//! - Keep column naming inside core.

pub mod selector;
