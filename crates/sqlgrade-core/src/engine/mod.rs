pub mod grader;
pub mod precompute;
pub mod runner;
