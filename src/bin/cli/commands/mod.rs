pub mod documents;
pub mod import;
pub mod quiz;
pub mod stats;
pub mod subjects;
