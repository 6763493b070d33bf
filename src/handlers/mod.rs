// src/handlers/mod.rs

pub mod exam_session;
pub mod results;
