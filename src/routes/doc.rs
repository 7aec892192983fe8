use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    availability::{Availability, Countdown, DateRange, PaymentState, TimeState, TrafficLight},
    dto::{
        addresses::{AddressList, AddressRequest},
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        categories::{CategoryList, CategoryRequest},
        cycles::{
            CreateCycleRequest, CycleDetails, CycleList, CycleSummary, SessionRequest,
            SessionView, SetEnrollmentOpenRequest, UpdateCycleRequest,
        },
        enrollments::{
            EnrollRequest, EnrollResponse, EnrollmentList, EnrollmentView, Participant,
            ParticipantList,
        },
        logs::AuditLogList,
        payments::{CreatePaymentRequest, PaymentList},
        reports::{
            InstructorReport, InstructorRow, OccupancyReport, OccupancyRow, RevenueReport,
            RevenueRow,
        },
        reviews::{CreateReviewRequest, ReviewList},
        users::{SetRolesRequest, UserList},
        workshops::{CreateWorkshopRequest, UpdateWorkshopRequest, WorkshopDetails, WorkshopList},
    },
    models::{
        Address, AuditLog, Category, Enrollment, EnrollmentStatus, Payment, PaymentStatus, Review,
        Role, User, Workshop, WorkshopCycle, WorkshopSession,
    },
    response::{ApiResponse, Meta},
    routes::{
        addresses, auth, categories, cycles, enrollments, health, logs, params, payments,
        reports, reviews, users, workshops,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        addresses::list_addresses,
        addresses::get_address,
        addresses::create_address,
        addresses::update_address,
        addresses::delete_address,
        workshops::list_workshops,
        workshops::get_workshop,
        workshops::create_workshop,
        workshops::update_workshop,
        workshops::delete_workshop,
        cycles::list_cycles,
        cycles::my_cycles,
        cycles::get_cycle,
        cycles::create_cycle,
        cycles::update_cycle,
        cycles::set_enrollment_open,
        cycles::delete_cycle,
        cycles::add_session,
        cycles::update_session,
        cycles::delete_session,
        enrollments::enroll,
        enrollments::cancel_enrollment,
        enrollments::my_enrollments,
        enrollments::cycle_participants,
        payments::list_payments,
        payments::payments_for_enrollment,
        payments::create_payment,
        payments::mark_paid,
        reviews::list_reviews,
        reviews::create_review,
        reviews::delete_review,
        users::list_users,
        users::set_roles,
        users::delete_user,
        logs::list_logs,
        reports::occupancy,
        reports::revenue,
        reports::instructors
    ),
    components(
        schemas(
            Role,
            EnrollmentStatus,
            PaymentStatus,
            User,
            Category,
            Address,
            Workshop,
            WorkshopCycle,
            WorkshopSession,
            Enrollment,
            Payment,
            Review,
            AuditLog,
            TrafficLight,
            Availability,
            TimeState,
            Countdown,
            PaymentState,
            DateRange,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CategoryRequest,
            CategoryList,
            AddressRequest,
            AddressList,
            CreateWorkshopRequest,
            UpdateWorkshopRequest,
            WorkshopList,
            WorkshopDetails,
            CreateCycleRequest,
            UpdateCycleRequest,
            SetEnrollmentOpenRequest,
            SessionRequest,
            CycleSummary,
            SessionView,
            CycleDetails,
            CycleList,
            EnrollRequest,
            EnrollResponse,
            EnrollmentView,
            EnrollmentList,
            Participant,
            ParticipantList,
            CreatePaymentRequest,
            PaymentList,
            CreateReviewRequest,
            ReviewList,
            SetRolesRequest,
            UserList,
            AuditLogList,
            OccupancyRow,
            RevenueRow,
            InstructorRow,
            OccupancyReport,
            RevenueReport,
            InstructorReport,
            params::Pagination,
            params::SortOrder,
            params::WorkshopSortBy,
            params::WorkshopQuery,
            params::CycleQuery,
            params::PaymentQuery,
            params::UserQuery,
            params::LogQuery,
            Meta,
            ApiResponse<User>,
            ApiResponse<WorkshopDetails>,
            ApiResponse<EnrollResponse>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Categories", description = "Workshop categories"),
        (name = "Addresses", description = "Workshop venues"),
        (name = "Workshops", description = "Workshop catalog"),
        (name = "Cycles", description = "Workshop cycles and sessions"),
        (name = "Enrollments", description = "Enrollment endpoints"),
        (name = "Payments", description = "Payment endpoints"),
        (name = "Reviews", description = "Workshop reviews"),
        (name = "Users", description = "User administration"),
        (name = "Admin", description = "Audit log and reports"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
