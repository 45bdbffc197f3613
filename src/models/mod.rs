// src/models/mod.rs

pub mod course;
pub mod exam_attempt;
pub mod mock_exam;
pub mod progress;
pub mod sent_email;
pub mod submission;
pub mod user;
