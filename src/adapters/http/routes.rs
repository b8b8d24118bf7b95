use actix_web::web;
use std::sync::Arc;

use crate::domain::auth::AuthService;

use super::handlers::account::{
  AccountUseCases, confirm_email_handler, get_user_handler, sign_in_handler,
  sign_up_admin_handler, sign_up_handler,
};
use super::handlers::health::health_handler;
use super::middleware::IdentityMiddleware;

/// Configure account routes
///
/// # Routes
///
/// - POST /api/account/sign-up - Create a user account
/// - POST /api/account/sign-up-admin - Create an admin account
/// - POST /api/account/sign-in - Authenticate and open a session
/// - GET /api/account/confirm-email - Confirm an email from its verification link
///
/// A bearer session is optional here; when present the caller is recorded
/// as the acting user.
///
/// `sign-up-admin` is open to anonymous callers and grants the Admin role.
/// Deployments that expose this service publicly must gate that path in
/// front of it (or leave it unrouted).
pub fn configure_account_routes(
  cfg: &mut web::ServiceConfig,
  use_cases: web::Data<AccountUseCases>,
  auth_service: Arc<AuthService>,
) {
  cfg.service(
    web::scope("/api/account")
      .app_data(use_cases)
      .wrap(IdentityMiddleware::optional(auth_service))
      .route("/sign-up", web::post().to(sign_up_handler))
      .route("/sign-up-admin", web::post().to(sign_up_admin_handler))
      .route("/sign-in", web::post().to(sign_in_handler))
      .route("/confirm-email", web::get().to(confirm_email_handler)),
  );
}

/// Configure user lookup routes
///
/// - GET /api/users/{username} - requires a bearer session
pub fn configure_user_routes(
  cfg: &mut web::ServiceConfig,
  use_cases: web::Data<AccountUseCases>,
  auth_service: Arc<AuthService>,
) {
  cfg.service(
    web::scope("/api/users")
      .app_data(use_cases)
      .wrap(IdentityMiddleware::required(auth_service))
      .route("/{username}", web::get().to(get_user_handler)),
  );
}

pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
  cfg.route("/health", web::get().to(health_handler));
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::http::middleware::TaskLocalRequestContext;
  use crate::application::auth::{
    ConfirmEmailUseCase, GetUserByUsernameUseCase, SignInUseCase, SignUpUseCase, auth_rule_sets,
  };
  use crate::application::pipelines::{
    AspectFactory, AspectPorts, AspectSettings, CONFIRM_EMAIL_ASPECTS, GET_USER_ASPECTS,
    SIGN_IN_ASPECTS, SIGN_UP_ASPECTS,
  };
  use crate::domain::auth::Role;
  use crate::test_support::{
    AuthFixture, InMemoryUnitOfWorkProvider, RecordingDiagnosticSink, RecordingLogger, TxEvent,
  };
  use actix_web::{
    App,
    http::StatusCode,
    test::{self, TestRequest},
  };
  use serde_json::{Value, json};

  struct Harness {
    fixture: AuthFixture,
    use_cases: web::Data<AccountUseCases>,
    unit_of_work: Arc<InMemoryUnitOfWorkProvider>,
    logger: Arc<RecordingLogger>,
  }

  fn harness() -> Harness {
    let fixture = AuthFixture::new();
    let unit_of_work = Arc::new(InMemoryUnitOfWorkProvider::new());
    let logger = Arc::new(RecordingLogger::new());

    let factory = AspectFactory::new(
      AspectPorts {
        unit_of_work: unit_of_work.clone(),
        rule_sets: Arc::new(auth_rule_sets()),
        logger: logger.clone(),
        request_context: Arc::new(TaskLocalRequestContext),
        diagnostics: Arc::new(RecordingDiagnosticSink::new()),
      },
      AspectSettings {
        audit_entry_logging: true,
        ..AspectSettings::default()
      },
    );
    let service = fixture.service.clone();

    let use_cases = web::Data::new(AccountUseCases {
      sign_up_user: Arc::new(SignUpUseCase::new(
        service.clone(),
        factory.pipeline(SIGN_UP_ASPECTS).unwrap(),
        Role::User,
      )),
      sign_up_admin: Arc::new(SignUpUseCase::new(
        service.clone(),
        factory.pipeline(SIGN_UP_ASPECTS).unwrap(),
        Role::Admin,
      )),
      sign_in: Arc::new(SignInUseCase::new(
        service.clone(),
        factory.pipeline(SIGN_IN_ASPECTS).unwrap(),
      )),
      confirm_email: Arc::new(ConfirmEmailUseCase::new(
        service.clone(),
        factory.pipeline(CONFIRM_EMAIL_ASPECTS).unwrap(),
      )),
      get_user: Arc::new(GetUserByUsernameUseCase::new(
        service,
        factory.pipeline(GET_USER_ASPECTS).unwrap(),
      )),
    });

    Harness {
      fixture,
      use_cases,
      unit_of_work,
      logger,
    }
  }

  fn sign_up_body(username: &str) -> Value {
    json!({
      "username": username,
      "email": format!("{}@example.com", username),
      "firstName": "Ken",
      "lastName": "Thompson",
      "password": "unix-1969-bell",
    })
  }

  macro_rules! app {
    ($h:expr) => {
      test::init_service(
        App::new()
          .configure(|cfg| {
            configure_account_routes(cfg, $h.use_cases.clone(), $h.fixture.service.clone())
          })
          .configure(|cfg| {
            configure_user_routes(cfg, $h.use_cases.clone(), $h.fixture.service.clone())
          })
          .configure(configure_health_routes),
      )
      .await
    };
  }

  #[actix_web::test]
  async fn test_health() {
    let h = harness();
    let app = app!(h);

    let resp = test::call_service(&app, TestRequest::get().uri("/health").to_request()).await;

    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[actix_web::test]
  async fn test_sign_up_commits_and_duplicate_conflicts() {
    let h = harness();
    let app = app!(h);

    let req = TestRequest::post()
      .uri("/api/account/sign-up")
      .set_json(sign_up_body("ken"))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(h.unit_of_work.events(), vec![TxEvent::Commit]);

    let req = TestRequest::post()
      .uri("/api/account/sign-up")
      .set_json(sign_up_body("ken"))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(
      h.unit_of_work.events(),
      vec![TxEvent::Commit, TxEvent::Rollback]
    );

    let records = h.logger.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["exceptionMessage"], "Username already exists");
    assert_eq!(records[0]["parameters"][0]["value"]["password"], "***");
  }

  #[actix_web::test]
  async fn test_invalid_sign_up_is_rejected_before_running() {
    let h = harness();
    let app = app!(h);
    let mut body = sign_up_body("ken");
    body["email"] = json!("not-an-email");

    let req = TestRequest::post()
      .uri("/api/account/sign-up")
      .set_json(body)
      .to_request();
    let resp: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp["error"], "validation_error");
    assert_eq!(resp["details"][0]["field"], "email");
    assert!(h.fixture.mailer.sent().is_empty());
  }

  #[actix_web::test]
  async fn test_admin_sign_up_confirm_sign_in_and_lookup() {
    let h = harness();
    let app = app!(h);

    let req = TestRequest::post()
      .uri("/api/account/sign-up-admin")
      .set_json(sign_up_body("dennis"))
      .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created["role"], "Admin");

    let mail = h.fixture.mailer.sent().remove(0);
    let start = mail.body.find("/api/account/confirm-email").unwrap();
    let end = start + mail.body[start..].find('"').unwrap();
    let req = TestRequest::get().uri(&mail.body[start..end]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::post()
      .uri("/api/account/sign-in")
      .set_json(json!({ "username": "dennis", "password": "unix-1969-bell" }))
      .to_request();
    let signed_in: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(signed_in["isVerified"], true);
    assert_eq!(signed_in["roles"], json!(["Admin"]));
    let token = signed_in["token"].as_str().unwrap().to_string();

    let req = TestRequest::get()
      .uri("/api/users/dennis")
      .insert_header(("Authorization", format!("Bearer {}", token)))
      .to_request();
    let user: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(user["email"], "dennis@example.com");

    let audit = h.logger.records();
    assert_eq!(audit.last().unwrap()["user"], "dennis");
    assert_eq!(audit.last().unwrap()["method"], "get_user_by_username");
  }

  #[actix_web::test]
  async fn test_user_lookup_requires_session() {
    let h = harness();
    let app = app!(h);

    let resp = test::call_service(
      &app,
      TestRequest::get().uri("/api/users/dennis").to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }
}
