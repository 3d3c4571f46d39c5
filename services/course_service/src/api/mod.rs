//! REST surface of the service.

pub mod auth;
pub mod request_id;

use std::convert::Infallible;

use actix_web::{error, web, HttpResponse};
use serde::de::DeserializeOwned;
use service_core::{EndpointError, OperationError};
use uuid::Uuid;

use self::auth::{Authenticated, MaybeAuthenticated};
use crate::operations::create_course::{create_course, CreateCourseError, CreateCourseInput};
use crate::operations::describe_course::{describe_course, DescribeCourseError};
use crate::operations::enroll::{enroll, EnrollError, EnrollInput};
use crate::operations::instructor_revenue::{instructor_revenue, InstructorRevenueError};
use crate::operations::list_active_courses::{list_active_courses, ListActiveCoursesInput};
use crate::operations::list_instructor_courses::{
    list_instructor_courses, ListInstructorCoursesError, ListInstructorCoursesInput,
};
use crate::operations::list_learner_enrollments::list_learner_enrollments;
use crate::operations::mark_lesson_complete::{
    mark_lesson_complete, MarkLessonCompleteError, MarkLessonCompleteInput,
};
use crate::operations::platform_summary::{platform_summary, PlatformSummaryError};
use crate::operations::publish_course::{publish_course, PublishCourseError};
use crate::operations::rate_course::{rate_course, RateCourseError, RateCourseInput};
use crate::operations::record_payment::{record_payment, RecordPaymentError, RecordPaymentInput};
use crate::operations::review_course::{approve_course, reject_course, ReviewCourseError};
use crate::operations::update_course_status::{
    update_course_status, UpdateCourseStatusError, UpdateCourseStatusInput,
};
use crate::operations::update_payment_status::{
    update_payment_status, UpdatePaymentStatusError, UpdatePaymentStatusInput,
};
use crate::Context;

type Ctx = web::Data<Context>;

/// Registers every route of the service. Malformed paths, queries and bodies are reported as
/// validation errors.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| bad_request(err)))
        .app_data(web::QueryConfig::default().error_handler(|err, _| bad_request(err)))
        .app_data(web::PathConfig::default().error_handler(|err, _| bad_request(err)))
        .route("/health", web::get().to(health))
        .service(
            web::scope("/api")
                .route("/courses", web::get().to(list_active_courses_handler))
                .route("/courses", web::post().to(create_course_handler))
                .route("/courses/{id}", web::get().to(describe_course_handler))
                .route("/courses/{id}/publish", web::post().to(publish_course_handler))
                .route("/courses/{id}/status", web::post().to(update_course_status_handler))
                .route("/courses/{id}/enroll", web::post().to(enroll_handler))
                .route("/instructor/courses", web::get().to(list_instructor_courses_handler))
                .route("/enrollments", web::get().to(list_learner_enrollments_handler))
                .route(
                    "/enrollments/{id}/lessons/{lesson_id}/complete",
                    web::post().to(mark_lesson_complete_handler),
                )
                .route("/enrollments/{id}/rating", web::post().to(rate_course_handler))
                .route("/admin/courses/{id}/approve", web::post().to(approve_course_handler))
                .route("/admin/courses/{id}/reject", web::post().to(reject_course_handler))
                .route("/admin/payments", web::post().to(record_payment_handler))
                .route(
                    "/admin/payments/{id}/status",
                    web::post().to(update_payment_status_handler),
                )
                .route(
                    "/analytics/instructor/{id}",
                    web::get().to(instructor_revenue_handler),
                )
                .route("/analytics/platform", web::get().to(platform_summary_handler)),
        );
}

fn bad_request(err: impl std::fmt::Display) -> error::Error {
    EndpointError::<Infallible>::validation(err.to_string()).into()
}

/// Reads a JSON body that may be left out, in which case the input takes its defaults.
fn optional_json<T, E>(body: &web::Bytes) -> Result<T, EndpointError<E>>
where
    T: DeserializeOwned + Default,
    E: OperationError,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| EndpointError::validation(format!("Json deserialize error: {}", e)))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "Status": "Ok" }))
}

async fn list_active_courses_handler(
    ctx: Ctx,
    query: web::Query<ListActiveCoursesInput>,
) -> Result<HttpResponse, EndpointError<Infallible>> {
    let output = list_active_courses(&ctx, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(output))
}

async fn create_course_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
    body: web::Json<CreateCourseInput>,
) -> Result<HttpResponse, EndpointError<CreateCourseError>> {
    let output = create_course(&ctx, &caller, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(output))
}

async fn describe_course_handler(
    ctx: Ctx,
    MaybeAuthenticated(caller): MaybeAuthenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, EndpointError<DescribeCourseError>> {
    let output = describe_course(&ctx, caller.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(output))
}

async fn publish_course_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, EndpointError<PublishCourseError>> {
    let output = publish_course(&ctx, &caller, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(output))
}

async fn update_course_status_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCourseStatusInput>,
) -> Result<HttpResponse, EndpointError<UpdateCourseStatusError>> {
    let output = update_course_status(&ctx, &caller, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(output))
}

async fn enroll_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse, EndpointError<EnrollError>> {
    let input: EnrollInput = optional_json(&body)?;
    let output = enroll(&ctx, &caller, path.into_inner(), input).await?;
    let response = if output.created {
        HttpResponse::Created().json(output)
    } else {
        HttpResponse::Ok().json(output)
    };
    Ok(response)
}

async fn list_instructor_courses_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
    query: web::Query<ListInstructorCoursesInput>,
) -> Result<HttpResponse, EndpointError<ListInstructorCoursesError>> {
    let output = list_instructor_courses(&ctx, &caller, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(output))
}

async fn list_learner_enrollments_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
) -> Result<HttpResponse, EndpointError<Infallible>> {
    let output = list_learner_enrollments(&ctx, &caller).await?;
    Ok(HttpResponse::Ok().json(output))
}

async fn mark_lesson_complete_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Bytes,
) -> Result<HttpResponse, EndpointError<MarkLessonCompleteError>> {
    let (enrollment_id, lesson_id) = path.into_inner();
    let input: MarkLessonCompleteInput = optional_json(&body)?;
    let output = mark_lesson_complete(&ctx, &caller, enrollment_id, lesson_id, input).await?;
    Ok(HttpResponse::Ok().json(output))
}

async fn rate_course_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<RateCourseInput>,
) -> Result<HttpResponse, EndpointError<RateCourseError>> {
    let output = rate_course(&ctx, &caller, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(output))
}

async fn approve_course_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, EndpointError<ReviewCourseError>> {
    let output = approve_course(&ctx, &caller, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(output))
}

async fn reject_course_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, EndpointError<ReviewCourseError>> {
    let output = reject_course(&ctx, &caller, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(output))
}

async fn record_payment_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
    body: web::Json<RecordPaymentInput>,
) -> Result<HttpResponse, EndpointError<RecordPaymentError>> {
    let output = record_payment(&ctx, &caller, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(output))
}

async fn update_payment_status_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePaymentStatusInput>,
) -> Result<HttpResponse, EndpointError<UpdatePaymentStatusError>> {
    let output = update_payment_status(&ctx, &caller, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(output))
}

async fn instructor_revenue_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, EndpointError<InstructorRevenueError>> {
    let output = instructor_revenue(&ctx, &caller, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(output))
}

async fn platform_summary_handler(
    ctx: Ctx,
    Authenticated(caller): Authenticated,
) -> Result<HttpResponse, EndpointError<PlatformSummaryError>> {
    let output = platform_summary(&ctx, &caller).await?;
    Ok(HttpResponse::Ok().json(output))
}

#[cfg(test)]
mod tests {
    use actix_web::http::header::AUTHORIZATION;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use service_core::auth::jwt::{encode_access_token, Claims};
    use service_core::auth::Role;
    use tracing_actix_web::TracingLogger;

    use super::request_id::{RequestIdHeader, REQUEST_ID_HEADER};
    use super::*;
    use crate::test_utils::{memory_context, SECRET};

    fn bearer(account_id: Uuid, role: Role) -> (actix_web::http::header::HeaderName, String) {
        let claims = Claims {
            sub: account_id.to_string(),
            email: "jane.doe@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            role,
            exp: 4_102_444_800,
        };
        let token = encode_access_token(&claims, SECRET).unwrap();
        (AUTHORIZATION, format!("Bearer {}", token))
    }

    fn course_body() -> Value {
        json!({
            "Title": "Rust for Busy People",
            "Description": "Ownership, borrowing and async in two weeks.",
            "Price": "1499",
            "CourseType": "Sprint",
            "Level": "Beginner",
            "Category": "Programming"
        })
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(memory_context()))
                    .wrap(RequestIdHeader)
                    .wrap(TracingLogger::default())
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn health_reports_ok_with_request_id() {
        let app = app!();

        let res = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(REQUEST_ID_HEADER));
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body, json!({ "Status": "Ok" }));
    }

    #[actix_web::test]
    async fn protected_routes_require_a_token() {
        let app = app!();

        let req = test::TestRequest::post().uri("/api/courses").set_json(course_body()).to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["ErrorKind"], "MissingToken");
    }

    #[actix_web::test]
    async fn garbage_tokens_are_rejected() {
        let app = app!();

        let req = test::TestRequest::get()
            .uri("/api/enrollments")
            .insert_header((AUTHORIZATION, "Bearer not-a-token"))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["ErrorKind"], "InvalidToken");
    }

    #[actix_web::test]
    async fn malformed_bodies_are_validation_errors() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/api/courses")
            .insert_header(bearer(Uuid::new_v4(), Role::Creator))
            .set_json(json!({ "Title": "Missing everything else" }))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["ErrorKind"], "Validation");
    }

    #[actix_web::test]
    async fn optional_bodies_must_still_be_well_formed() {
        let app = app!();
        let learner = Uuid::new_v4();

        let req = test::TestRequest::post()
            .uri(&format!("/api/courses/{}/enroll", Uuid::new_v4()))
            .insert_header(bearer(learner, Role::Learner))
            .set_json(json!({ "EnrollmentType": "lifetime" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["ErrorKind"], "Validation");

        let req = test::TestRequest::post()
            .uri(&format!(
                "/api/enrollments/{}/lessons/{}/complete",
                Uuid::new_v4(),
                Uuid::new_v4()
            ))
            .insert_header(bearer(learner, Role::Learner))
            .set_payload("{\"TimeSpentSeconds\": -1")
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn unknown_courses_are_not_found() {
        let app = app!();

        let req = test::TestRequest::get()
            .uri(&format!("/api/courses/{}", Uuid::new_v4()))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["ErrorKind"], "NotFound");
    }

    #[actix_web::test]
    async fn course_goes_from_draft_to_enrollment() {
        let app = app!();
        let creator = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let learner = Uuid::new_v4();

        let req = test::TestRequest::post()
            .uri("/api/courses")
            .insert_header(bearer(creator, Role::Creator))
            .set_json(course_body())
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["Course"]["Status"], "Draft");
        let course_id = body["Course"]["CourseId"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri(&format!("/api/courses/{}/publish", course_id))
            .insert_header(bearer(creator, Role::Creator))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        // Not listed until approved.
        let res = test::call_service(&app, test::TestRequest::get().uri("/api/courses").to_request()).await;
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["Courses"].as_array().map(Vec::len), Some(0));

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/courses/{}/approve", course_id))
            .insert_header(bearer(creator, Role::Creator))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri(&format!("/api/admin/courses/{}/approve", course_id))
            .insert_header(bearer(admin, Role::Admin))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["Course"]["Status"], "Active");

        let res = test::call_service(&app, test::TestRequest::get().uri("/api/courses").to_request()).await;
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["Courses"].as_array().map(Vec::len), Some(1));

        let req = test::TestRequest::post()
            .uri(&format!("/api/courses/{}/enroll", course_id))
            .insert_header(bearer(learner, Role::Learner))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri(&format!("/api/courses/{}/enroll", course_id))
            .insert_header(bearer(learner, Role::Learner))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["Created"], false);

        let req = test::TestRequest::get()
            .uri("/api/enrollments")
            .insert_header(bearer(learner, Role::Learner))
            .to_request();
        let res = test::call_service(&app, req).await;
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["Enrollments"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["Enrollments"][0]["CourseTitle"], "Rust for Busy People");
    }
}
