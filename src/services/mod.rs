// src/services/mod.rs

pub mod attempts;
pub mod grading;
pub mod intake;
pub mod notify;
pub mod progress;
pub mod reconciler;
pub mod reminders;
pub mod scoring;
pub mod storage;
