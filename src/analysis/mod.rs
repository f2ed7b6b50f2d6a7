//! Analysis pipeline.
//!
//! The engine orchestrates grouping, summaries, normality checks, test
//! selection, effect sizes, FDR correction and the bias assessment.

pub mod bias;
pub mod engine;
pub mod groups;
pub mod normality;
pub mod selector;
pub mod summarizer;

pub use engine::{analyze, analyze_session, AnalysisError};
