//! Study quiz engine.
//!
//! Subjects group documents, documents own multiple-choice questions. The
//! [`quiz`] module builds and runs sessions over those questions, [`stats`]
//! turns the attempt history into mastery statistics.

pub mod config;
pub mod ingest;
pub mod quiz;
pub mod stats;
pub mod storage;
