//! Buffer helpers and lag-domain search routines shared by the detectors.

pub mod buffer;
pub mod peak;
