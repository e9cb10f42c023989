//! Route modules for the Exam Shuffler server

pub mod exams;
pub mod health;
