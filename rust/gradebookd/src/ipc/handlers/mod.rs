pub mod backup_exchange;
pub mod core;
pub mod evaluations;
pub mod grades;
pub mod reports;
pub mod selection;
pub mod students;
pub mod subjects;
