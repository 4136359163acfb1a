//! Account recovery: challenge issuance, password replacement, and the
//! bulk revocation that follows it.

mod common;

use common::{client_ip, TestApp, PASSWORD};
use gatekey::errors::ErrorKind;

const NEW_PASSWORD: &str = "an-entirely-new-password";

#[tokio::test]
async fn recovery_replaces_the_password_and_kills_outstanding_sessions() {
    let app = TestApp::spawn();
    let (_, auth_token) = app.login("you@mail.com", "example_user").await;

    let (challenge, challenge_token) = app
        .gatekey
        .recovery
        .attempt_account_recovery("you@mail.com", client_ip())
        .await
        .unwrap();
    let code = challenge.code.clone().unwrap();

    let session = app
        .gatekey
        .verification
        .two_step_verification(&challenge_token, &code)
        .await
        .unwrap();
    app.gatekey
        .recovery
        .fulfill_account_recovery(&session, NEW_PASSWORD)
        .await
        .unwrap();

    // Old password is gone, new one works.
    let err = app
        .gatekey
        .authentication
        .login("you@mail.com", PASSWORD, client_ip(), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Credentials);
    assert!(app
        .gatekey
        .authentication
        .login("you@mail.com", NEW_PASSWORD, client_ip(), false)
        .await
        .is_ok());

    // The pre-recovery authentication session died with the old password.
    let err = app
        .gatekey
        .authentication
        .authenticate(&auth_token, client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Invalid);
}

#[tokio::test]
async fn recovery_for_an_unknown_email_is_not_found() {
    let app = TestApp::spawn();

    let err = app
        .gatekey
        .recovery
        .attempt_account_recovery("nobody@mail.com", client_ip())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn recovery_rejects_a_short_replacement_password() {
    let app = TestApp::spawn();
    app.register_verified("you@mail.com", "example_user").await;

    let (challenge, challenge_token) = app
        .gatekey
        .recovery
        .attempt_account_recovery("you@mail.com", client_ip())
        .await
        .unwrap();
    let session = app
        .gatekey
        .verification
        .two_step_verification(&challenge_token, &challenge.code.clone().unwrap())
        .await
        .unwrap();

    let err = app
        .gatekey
        .recovery
        .fulfill_account_recovery(&session, "short")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Credentials);
    assert_eq!(err.status, http::StatusCode::BAD_REQUEST);

    // The old password still works.
    assert!(app
        .gatekey
        .authentication
        .login("you@mail.com", PASSWORD, client_ip(), false)
        .await
        .is_ok());
}
