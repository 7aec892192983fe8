pub mod addresses;
pub mod audit_logs;
pub mod categories;
pub mod enrollments;
pub mod payments;
pub mod reviews;
pub mod roles;
pub mod user_roles;
pub mod users;
pub mod workshop_cycles;
pub mod workshop_sessions;
pub mod workshops;

pub use addresses::Entity as Addresses;
pub use audit_logs::Entity as AuditLogs;
pub use categories::Entity as Categories;
pub use enrollments::Entity as Enrollments;
pub use payments::Entity as Payments;
pub use reviews::Entity as Reviews;
pub use roles::Entity as Roles;
pub use user_roles::Entity as UserRoles;
pub use users::Entity as Users;
pub use workshop_cycles::Entity as WorkshopCycles;
pub use workshop_sessions::Entity as WorkshopSessions;
pub use workshops::Entity as Workshops;
