//! Leave calendar export.

pub mod export;
pub mod ics;
