pub mod name;
pub mod region;
