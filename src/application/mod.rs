pub mod admin;
pub mod catalog;
pub mod error;
pub mod interactions;
pub mod pagination;
pub mod repos;
