// src/models/mod.rs

pub mod comment;
pub mod host;
pub mod page;
pub mod post;
pub mod reaction;
pub mod user;
