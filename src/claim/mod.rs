pub mod endpoints;
pub mod manager;
