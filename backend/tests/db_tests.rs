use backend::{
    db::{Database, NewUser},
    error::AppError,
};

mod helpers;

fn new_user(login_name: &str) -> NewUser {
    NewUser {
        login_name: login_name.to_string(),
        password_hash: "$2b$04$placeholderplaceholderplaceholderplaceholderpla".to_string(),
        display_name: "Someone".to_string(),
        email: None,
    }
}

async fn test_db() -> Database {
    helpers::test_state().await.identity.database().clone()
}

#[tokio::test]
async fn test_unique_index_rejects_duplicate_insert() {
    let db = test_db().await;

    let first = db.insert_user(new_user("oscar")).await.unwrap();
    assert_eq!(first.login_name, "oscar");
    assert_eq!(db.count_users().await.unwrap(), 1);

    // Skips the service's lookup, so only the storage constraint stands in the way.
    let second = db.insert_user(new_user("oscar")).await;
    assert!(
        matches!(second, Err(AppError::Conflict(_))),
        "expected Conflict, got {second:?}"
    );
    assert_eq!(db.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_user_lookups_round_through_the_store() {
    let db = test_db().await;
    let inserted = db.insert_user(new_user("peggy")).await.unwrap();

    let by_name = db.find_user_by_login_name("peggy").await.unwrap().unwrap();
    let by_id = db.find_user_by_id(inserted.id).await.unwrap().unwrap();
    assert_eq!(by_name.id, inserted.id);
    assert_eq!(by_id.login_name, "peggy");
    assert!(db.find_user_by_login_name("nobody").await.unwrap().is_none());
    assert!(db.find_user_by_id(inserted.id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sync_is_repeatable() {
    let db = test_db().await;
    db.insert_user(new_user("quentin")).await.unwrap();

    db.sync().await.unwrap();

    assert_eq!(db.count_users().await.unwrap(), 1);
}
