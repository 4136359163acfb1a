//! Role and permission checks, and first-boot admin provisioning.

mod common;

use common::TestApp;
use gatekey::errors::ErrorKind;
use gatekey::models::{Permission, Role};
use gatekey::repository::Repository;

#[tokio::test]
async fn role_check_passes_only_for_held_roles() {
    let app = TestApp::spawn();
    let account = app.register_verified("you@mail.com", "example_user").await;

    let role = Role::new("Moderator", "Can moderate content.");
    app.repository.create_role(&role).await.unwrap();
    app.repository
        .assign_role(account.id, role.id)
        .await
        .unwrap();

    assert!(app
        .gatekey
        .authorization
        .require_role(&account, "Moderator")
        .await
        .is_ok());

    let err = app
        .gatekey
        .authorization
        .require_role(&account, "Admin")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InsufficientRole);
    assert_eq!(err.status, http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn wildcard_permissions_cover_their_whole_subtree() {
    let app = TestApp::spawn();
    let account = app.register_verified("you@mail.com", "example_user").await;

    let permission = Permission::new("admin:*");
    app.repository.create_permission(&permission).await.unwrap();
    app.repository
        .assign_permission(account.id, permission.id)
        .await
        .unwrap();

    assert!(app
        .gatekey
        .authorization
        .require_permission(&account, "admin:update")
        .await
        .is_ok());
    assert!(app
        .gatekey
        .authorization
        .require_permission(&account, "admin:billing:view")
        .await
        .is_ok());

    let err = app
        .gatekey
        .authorization
        .require_permission(&account, "printer:query")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InsufficientPermission);
}

#[tokio::test]
async fn bootstrap_admin_is_idempotent_and_all_powerful() {
    let app = TestApp::spawn();

    let admin = app
        .gatekey
        .bootstrap_admin("admin@mail.com", "a-strong-admin-password")
        .await
        .unwrap();
    assert!(admin.verified);

    assert!(app
        .gatekey
        .authorization
        .require_role(&admin, "Head Admin")
        .await
        .is_ok());
    assert!(app
        .gatekey
        .authorization
        .require_permission(&admin, "anything:at-all")
        .await
        .is_ok());

    // Second call returns the existing account instead of failing.
    let again = app
        .gatekey
        .bootstrap_admin("admin@mail.com", "a-strong-admin-password")
        .await
        .unwrap();
    assert_eq!(again.id, admin.id);
}
