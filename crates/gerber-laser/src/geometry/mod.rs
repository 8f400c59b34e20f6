pub mod clearance;
pub mod mirror;
pub mod path;
pub mod shapes;
