pub mod context;
pub mod counter;
pub mod decision;
