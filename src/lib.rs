//! Monte Carlo resolution of tabletop wargame attacks: keyword parsing, the
//! hit / wound / save / damage pipeline, batch statistics and scenario reports.

pub mod cli;
pub mod combat;
pub mod config;
pub mod data;
pub mod error;
pub mod orchestrator;
pub mod parallel;
