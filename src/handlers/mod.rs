// src/handlers/mod.rs

pub mod admin;
pub mod course;
pub mod exam;
pub mod lesson;
pub mod progress;
