pub mod attendant_service;
pub mod auth;
pub mod client_service;
pub mod dashboard_service;
pub mod gateways;
pub mod integration_service;
pub mod loyalty_service;
pub mod rbac_service;
pub mod seed_service;
pub mod survey_service;
pub mod tenancy_service;
pub mod treatment_service;
pub mod upload_service;
pub mod voucher_service;
