pub mod tle;
pub mod geometry;
pub mod pass;
pub mod dapnet;
pub mod tracker;
pub mod scheduled;
