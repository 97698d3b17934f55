//! Helper functions shared by call handlers.

pub mod datatypes;
pub mod options;
