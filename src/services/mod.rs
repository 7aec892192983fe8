pub mod address_service;
pub mod auth_service;
pub mod category_service;
pub mod cycle_service;
pub mod enrollment_service;
pub mod log_service;
pub mod payment_service;
pub mod report_service;
pub mod review_service;
pub mod user_service;
pub mod workshop_service;
