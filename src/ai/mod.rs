pub mod connector;
pub mod prompt;
pub mod remote_classifier;
