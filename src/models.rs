pub mod attendant;
pub mod auth;
pub mod client;
pub mod dashboard;
pub mod integrations;
pub mod loyalty;
pub mod rbac;
pub mod survey;
pub mod tenancy;
pub mod treatment;
