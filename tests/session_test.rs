//! Session lifecycle: the authenticated-request guard, refresh, revocation,
//! decoding, and expiry.

mod common;

use chrono::{Duration, Utc};
use common::{client_ip, ip, TestApp};
use gatekey::errors::ErrorKind;
use gatekey::repository::Repository;
use gatekey::services::{SessionClaims, TokenCodec};

#[tokio::test]
async fn authenticate_accepts_a_fresh_session_from_a_known_location() {
    let app = TestApp::spawn();
    let (issued, token) = app.login("you@mail.com", "example_user").await;

    let session = app
        .gatekey
        .authentication
        .authenticate(&token, client_ip())
        .await
        .unwrap();

    assert_eq!(session.id, issued.id);
}

#[tokio::test]
async fn authenticate_rejects_an_unknown_location() {
    let app = TestApp::spawn();
    let (_, token) = app.login("you@mail.com", "example_user").await;

    let err = app
        .gatekey
        .authentication
        .authenticate(&token, ip("9.9.9.9"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::UnknownLocation);
}

#[tokio::test]
async fn a_second_login_from_a_new_ip_makes_it_known() {
    let app = TestApp::spawn();
    let (_, token) = app.login("you@mail.com", "example_user").await;

    app.gatekey
        .authentication
        .login("you@mail.com", common::PASSWORD, ip("9.9.9.9"), false)
        .await
        .unwrap();

    assert!(app
        .gatekey
        .authentication
        .authenticate(&token, ip("9.9.9.9"))
        .await
        .is_ok());
}

#[tokio::test]
async fn logout_deactivates_the_session() {
    let app = TestApp::spawn();
    let (mut session, token) = app.login("you@mail.com", "example_user").await;

    app.gatekey.authentication.logout(&mut session).await.unwrap();

    let err = app
        .gatekey
        .authentication
        .authenticate(&token, client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Invalid);
    assert_eq!(err.message, "Session has been deactivated.");
}

#[tokio::test]
async fn refresh_revokes_the_old_session_and_issues_a_new_one() {
    let app = TestApp::spawn();
    let (old_session, old_token) = app.login("you@mail.com", "example_user").await;

    let (new_session, new_token) = app
        .gatekey
        .authentication
        .refresh_authentication(&old_token, client_ip(), false)
        .await
        .unwrap();

    assert_ne!(new_session.id, old_session.id);
    assert!(app
        .gatekey
        .authentication
        .authenticate(&new_token, client_ip())
        .await
        .is_ok());
    assert!(app
        .gatekey
        .authentication
        .authenticate(&old_token, client_ip())
        .await
        .is_err());
}

#[tokio::test]
async fn expired_session_reports_expired_not_invalid() {
    let app = TestApp::spawn();
    let (mut session, token) = app.login("you@mail.com", "example_user").await;

    session.expiration_date = Utc::now() - Duration::seconds(1);
    app.repository.save_session(&session).await.unwrap();

    let err = app
        .gatekey
        .authentication
        .authenticate(&token, client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Expired);
    assert_eq!(err.message, "Session has expired.");
}

#[tokio::test]
async fn expired_session_cannot_be_refreshed() {
    let app = TestApp::spawn();
    let (mut session, token) = app.login("you@mail.com", "example_user").await;

    session.expiration_date = Utc::now() - Duration::seconds(1);
    app.repository.save_session(&session).await.unwrap();

    let err = app
        .gatekey
        .authentication
        .refresh_authentication(&token, client_ip(), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Expired);
}

#[tokio::test]
async fn soft_deleted_session_is_indistinguishable_from_a_missing_one() {
    let app = TestApp::spawn();
    let (mut session, token) = app.login("you@mail.com", "example_user").await;

    session.deleted = true;
    app.repository.save_session(&session).await.unwrap();

    let err = app
        .gatekey
        .authentication
        .authenticate(&token, client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.status, http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rotating_the_secret_invalidates_outstanding_tokens() {
    let app = TestApp::spawn();
    let (_, token) = app.login("you@mail.com", "example_user").await;

    let rotated = TestApp::spawn_with(gatekey::config::GatekeyConfig {
        secret: "rotated-secret".to_string(),
        ..gatekey::config::GatekeyConfig::default()
    });

    let err = rotated
        .gatekey
        .authentication
        .authenticate(&token, client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Decode);
}

#[tokio::test]
async fn forged_token_for_a_missing_session_is_not_found() {
    let app = TestApp::spawn();
    let codec = TokenCodec::new(&app.gatekey.config.secret);
    let token = codec
        .encode(&SessionClaims {
            iat: Utc::now().timestamp(),
            jti: uuid::Uuid::new_v4(),
            ip: client_ip(),
        })
        .unwrap();

    let err = app
        .gatekey
        .authentication
        .authenticate(&token, client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn proxy_origins_are_rejected_when_detection_is_enabled() {
    use gatekey::repository::InMemoryRepository;
    use gatekey::services::{
        DenylistProxyDetector, EmailProvider, MockEmailService, MockSmsService, SmsProvider,
    };
    use std::sync::Arc;

    let repository = Arc::new(InMemoryRepository::new());
    let collaborators = gatekey::Collaborators::new(
        repository as Arc<dyn Repository>,
        Arc::new(MockEmailService::new()) as Arc<dyn EmailProvider>,
        Arc::new(MockSmsService::new()) as Arc<dyn SmsProvider>,
    )
    .with_proxy_detector(Arc::new(DenylistProxyDetector::new([ip("6.6.6.6")])));
    let gatekey = gatekey::Gatekey::new(
        gatekey::config::GatekeyConfig {
            proxy_detection: true,
            ..gatekey::config::GatekeyConfig::default()
        },
        collaborators,
    );

    gatekey
        .authentication
        .register(
            common::credentials("you@mail.com", "example_user"),
            true,
            false,
        )
        .await
        .unwrap();
    let (_, token) = gatekey
        .authentication
        .login("you@mail.com", common::PASSWORD, ip("6.6.6.6"), false)
        .await
        .unwrap();

    let err = gatekey
        .authentication
        .authenticate(&token, ip("6.6.6.6"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ProhibitedProxy);
    assert_eq!(err.status, http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn non_authentication_tokens_are_rejected_by_the_guard() {
    let app = TestApp::spawn();
    app.login("you@mail.com", "example_user").await;
    let (_, captcha_token) = app
        .gatekey
        .verification
        .request_captcha(client_ip())
        .await
        .unwrap();

    let err = app
        .gatekey
        .authentication
        .authenticate(&captcha_token, client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}
