pub mod analytics;
pub mod classes;
pub mod core;
pub mod reports;
pub mod results;
pub mod students;
pub mod subjects;
