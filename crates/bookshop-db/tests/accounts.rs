//! Integration tests for the account directory.

use chrono::Utc;
use uuid::Uuid;

use bookshop_core::{CoreError, User, UserRole};
use bookshop_db::{Database, DbConfig, DbError};

async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

fn new_user(username: &str, email: &str, telephone: &str, role: UserRole) -> User {
    User {
        id: Uuid::new_v4().to_string(),
        name: format!("User {}", username),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: "not-a-real-hash".to_string(),
        address: None,
        telephone: telephone.to_string(),
        role,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn insert_and_fetch() {
    let db = test_db().await;
    let user = new_user("alice", "alice@example.com", "5550000001", UserRole::Customer);
    db.users().insert(&user).await.unwrap();

    let by_id = db.users().get_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(by_id.username, "alice");

    let by_username = db.users().get_by_username("alice").await.unwrap().unwrap();
    assert_eq!(by_username.id, user.id);

    let by_email = db
        .users()
        .get_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_email.id, user.id);
}

#[tokio::test]
async fn duplicates_report_the_colliding_field() {
    let db = test_db().await;
    let alice = new_user("alice", "alice@example.com", "5550000001", UserRole::Customer);
    db.users().insert(&alice).await.unwrap();

    let dup_username = new_user("alice", "other@example.com", "5550000002", UserRole::Customer);
    match db.users().insert(&dup_username).await.unwrap_err() {
        DbError::UniqueViolation { field, .. } => assert_eq!(field, "username"),
        other => panic!("expected UniqueViolation, got {:?}", other),
    }

    let dup_email = new_user("bob", "alice@example.com", "5550000002", UserRole::Customer);
    match db.users().insert(&dup_email).await.unwrap_err() {
        DbError::UniqueViolation { field, .. } => assert_eq!(field, "email"),
        other => panic!("expected UniqueViolation, got {:?}", other),
    }

    let dup_phone = new_user("bob", "bob@example.com", "5550000001", UserRole::Customer);
    match db.users().insert(&dup_phone).await.unwrap_err() {
        DbError::UniqueViolation { field, .. } => assert_eq!(field, "telephone"),
        other => panic!("expected UniqueViolation, got {:?}", other),
    }
}

#[tokio::test]
async fn insert_validates_fields() {
    let db = test_db().await;

    // Username too short
    let err = db
        .users()
        .insert(&new_user("ab", "a@example.com", "5550000001", UserRole::Customer))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

    // Malformed email
    let err = db
        .users()
        .insert(&new_user("alice", "not-an-email", "5550000001", UserRole::Customer))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

    // Telephone must be exactly 10 digits
    let err = db
        .users()
        .insert(&new_user("alice", "a@example.com", "12345", UserRole::Customer))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

    let err = db
        .users()
        .insert(&new_user("alice", "a@example.com", "555-000-11", UserRole::Customer))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
}

#[tokio::test]
async fn update_profile_excludes_self_from_uniqueness() {
    let db = test_db().await;
    let alice = new_user("alice", "alice@example.com", "5550000001", UserRole::Customer);
    db.users().insert(&alice).await.unwrap();
    let bob = new_user("bob", "bob@example.com", "5550000002", UserRole::Customer);
    db.users().insert(&bob).await.unwrap();

    // Keeping her own email and phone is fine
    db.users()
        .update_profile(
            &alice.id,
            "Alice Smith",
            "alice@example.com",
            Some("1 Main St"),
            "5550000001",
        )
        .await
        .unwrap();

    let stored = db.users().get_by_id(&alice.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Alice Smith");
    assert_eq!(stored.address.as_deref(), Some("1 Main St"));

    // Taking Bob's email is not
    let err = db
        .users()
        .update_profile(&alice.id, "Alice", "bob@example.com", None, "5550000001")
        .await
        .unwrap_err();
    match err {
        DbError::UniqueViolation { field, .. } => assert_eq!(field, "email"),
        other => panic!("expected UniqueViolation, got {:?}", other),
    }
}

#[tokio::test]
async fn update_profile_requires_a_name() {
    let db = test_db().await;
    let alice = new_user("alice", "alice@example.com", "5550000001", UserRole::Customer);
    db.users().insert(&alice).await.unwrap();

    let err = db
        .users()
        .update_profile(&alice.id, "   ", "alice@example.com", None, "5550000001")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

    let stored = db.users().get_by_id(&alice.id).await.unwrap().unwrap();
    assert_eq!(stored.name, alice.name);
}

#[tokio::test]
async fn roles_and_password_updates() {
    let db = test_db().await;
    let alice = new_user("alice", "alice@example.com", "5550000001", UserRole::Customer);
    db.users().insert(&alice).await.unwrap();

    db.users().set_role(&alice.id, UserRole::Staff).await.unwrap();
    let stored = db.users().get_by_id(&alice.id).await.unwrap().unwrap();
    assert_eq!(stored.role, UserRole::Staff);

    db.users()
        .update_password(&alice.id, "new-hash")
        .await
        .unwrap();
    let stored = db.users().get_by_id(&alice.id).await.unwrap().unwrap();
    assert_eq!(stored.password_hash, "new-hash");
}

#[tokio::test]
async fn listings() {
    let db = test_db().await;
    db.users()
        .insert(&new_user("carol", "carol@example.com", "5550000003", UserRole::Customer))
        .await
        .unwrap();
    db.users()
        .insert(&new_user("alice", "alice@example.com", "5550000001", UserRole::Admin))
        .await
        .unwrap();
    db.users()
        .insert(&new_user("bob", "bob@example.com", "5550000002", UserRole::Customer))
        .await
        .unwrap();

    let all = db.users().list_all().await.unwrap();
    assert_eq!(all.len(), 3);
    // Sorted by username
    assert_eq!(all[0].username, "alice");
    assert_eq!(all[2].username, "carol");

    let customers = db.users().list_by_role(UserRole::Customer).await.unwrap();
    assert_eq!(customers.len(), 2);

    assert_eq!(db.users().count().await.unwrap(), 3);
}

#[tokio::test]
async fn delete_account() {
    let db = test_db().await;
    let alice = new_user("alice", "alice@example.com", "5550000001", UserRole::Customer);
    db.users().insert(&alice).await.unwrap();

    db.users().delete(&alice.id).await.unwrap();
    assert!(db.users().get_by_id(&alice.id).await.unwrap().is_none());

    let err = db.users().delete(&alice.id).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}
