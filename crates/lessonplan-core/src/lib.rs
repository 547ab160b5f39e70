//! Core library for lesson plan generation.
//!
//! Turns free-form model output into a strictly ordered, chapter-grouped
//! lesson plan and packages it as a word-processor document.

pub mod attachment;
pub mod export;
pub mod gateway;
pub mod math;
pub mod plan;
pub mod session;
