pub mod user_repo;
pub use user_repo::UserRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod attendant_repo;
pub use attendant_repo::AttendantRepository;
pub mod survey_repo;
pub use survey_repo::SurveyRepository;
pub mod client_repo;
pub use client_repo::ClientRepository;
pub mod loyalty_repo;
pub use loyalty_repo::LoyaltyRepository;
pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
pub mod treatment_repo;
pub use treatment_repo::TreatmentRepository;
pub mod integration_repo;
pub use integration_repo::IntegrationRepository;
