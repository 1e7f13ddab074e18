/// Integration tests for the library layers
/// Exercises accounts, membership, the message log and chat teardown through direct calls
use group_chat_server::auth::{TokenAuthority, TokenSettings};
use group_chat_server::chat::{ChatLifecycle, MembershipLedger, MessageLog};
use group_chat_server::db::models::MessageKind;
use group_chat_server::db::{create_test_pool, Database, DbPool};
use group_chat_server::error::{AuthError, LifecycleError, LogError, MembershipError};

fn authority(pool: &DbPool) -> TokenAuthority {
    TokenAuthority::new(
        pool.clone(),
        TokenSettings {
            secret: "integration-secret".to_string(),
            ttl_seconds: 3600,
            bcrypt_cost: 4,
        },
    )
}

async fn user(pool: &DbPool, name: &str) -> i64 {
    Database::create_user(pool, name, &format!("{name}@example.com"), "hash")
        .await
        .expect("Failed to create user")
        .id
}

#[tokio::test]
async fn test_account_workflow() {
    let pool = create_test_pool();
    let authority = authority(&pool);

    let alice = authority
        .register("alice", "alice@example.com", "first")
        .await
        .expect("Failed to register alice");
    assert!(matches!(
        authority.register("alice", "other@example.com", "x").await,
        Err(AuthError::UserExists)
    ));

    let first = authority.login("alice", "first").await.expect("login failed");
    let claims = authority.authenticate(&first.token).await.expect("token rejected");
    assert_eq!(claims.user_id().unwrap(), alice.id);

    // Wrong password and unknown user are indistinguishable
    let wrong = authority.login("alice", "nope").await.unwrap_err();
    let unknown = authority.login("mallory", "first").await.unwrap_err();
    assert_eq!(wrong.to_string(), unknown.to_string());

    authority
        .change_password(alice.id, "first", "second")
        .await
        .expect("password change failed");

    assert!(matches!(
        authority.authenticate(&first.token).await,
        Err(AuthError::Revoked)
    ));
    assert!(authority.login("alice", "first").await.is_err());

    let second = authority.login("alice", "second").await.expect("login failed");
    assert!(authority.revoke(&second.claims));
    assert!(matches!(
        authority.authenticate(&second.token).await,
        Err(AuthError::Revoked)
    ));
}

#[tokio::test]
async fn test_chat_conversation_workflow() {
    let pool = create_test_pool();
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;
    let eve = user(&pool, "eve").await;

    let chat = MembershipLedger::create_chat(&pool, alice, "general")
        .await
        .expect("Failed to create chat");
    ChatLifecycle::add_user(&pool, chat.id, alice, bob)
        .await
        .expect("Failed to add bob");

    MessageLog::append(&pool, chat.id, alice, "hi").await.unwrap();
    MessageLog::append(&pool, chat.id, bob, "there").await.unwrap();
    MessageLog::append(&pool, chat.id, alice, "!").await.unwrap();

    let messages = MessageLog::list_by_chat(&pool, chat.id, bob).await.unwrap();
    let contents: Vec<&str> = messages
        .iter()
        .filter(|m| m.kind == MessageKind::User)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["hi", "there", "!"]);

    // Sequence numbers strictly increase; timestamps never go backwards
    for pair in messages.windows(2) {
        assert!(pair[0].created_at <= pair[1].created_at);
        assert!(pair[0].seq < pair[1].seq);
    }

    assert!(matches!(
        MessageLog::append(&pool, chat.id, eve, "let me in").await,
        Err(LogError::NotMember)
    ));
    assert!(matches!(
        MessageLog::list_by_chat(&pool, chat.id, eve).await,
        Err(LogError::NotMember)
    ));
}

#[tokio::test]
async fn test_chat_teardown_workflow() {
    let pool = create_test_pool();
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;

    let chat = MembershipLedger::create_chat(&pool, alice, "pair").await.unwrap();
    ChatLifecycle::add_user(&pool, chat.id, alice, bob).await.unwrap();
    MessageLog::append(&pool, chat.id, bob, "bye").await.unwrap();

    let first = ChatLifecycle::leave(&pool, chat.id, alice).await.unwrap();
    assert!(!first.chat_deleted);
    assert_eq!(first.remaining_members, 1);

    let last = ChatLifecycle::leave(&pool, chat.id, bob).await.unwrap();
    assert!(last.chat_deleted);

    assert!(MembershipLedger::get_chat(&pool, chat.id).await.unwrap().is_none());
    assert_eq!(MessageLog::count_for_chat(&pool, chat.id).await.unwrap(), 0);
    assert!(matches!(
        MessageLog::append(&pool, chat.id, bob, "hello?").await,
        Err(LogError::ChatNotFound)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_leave_tears_down_exactly_once() {
    for _ in 0..20 {
        let pool = create_test_pool();
        let alice = user(&pool, "alice").await;
        let bob = user(&pool, "bob").await;
        let chat_id = MembershipLedger::create_chat(&pool, alice, "race").await.unwrap().id;
        ChatLifecycle::add_user(&pool, chat_id, alice, bob).await.unwrap();

        let a = tokio::spawn({
            let pool = pool.clone();
            async move { ChatLifecycle::leave(&pool, chat_id, alice).await }
        });
        let b = tokio::spawn({
            let pool = pool.clone();
            async move { ChatLifecycle::leave(&pool, chat_id, bob).await }
        });

        let a = a.await.expect("task panicked").expect("alice leave failed");
        let b = b.await.expect("task panicked").expect("bob leave failed");

        let deletions = [a.chat_deleted, b.chat_deleted]
            .iter()
            .filter(|d| **d)
            .count();
        assert_eq!(deletions, 1);
        assert!(MembershipLedger::get_chat(&pool, chat_id).await.unwrap().is_none());
        assert_eq!(MessageLog::count_for_chat(&pool, chat_id).await.unwrap(), 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_leave() {
    let pool = create_test_pool();
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;
    let chat_id = MembershipLedger::create_chat(&pool, alice, "dup").await.unwrap().id;
    ChatLifecycle::add_user(&pool, chat_id, alice, bob).await.unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move { ChatLifecycle::leave(&pool, chat_id, alice).await })
        })
        .collect();

    let mut ok = 0;
    let mut not_member = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(outcome) => {
                assert!(!outcome.chat_deleted);
                ok += 1;
            }
            Err(LifecycleError::Membership(MembershipError::NotMember)) => not_member += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((ok, not_member), (1, 1));
    assert_eq!(MembershipLedger::member_count(&pool, chat_id).await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_keep_total_order() {
    let pool = create_test_pool();
    let alice = user(&pool, "alice").await;
    let bob = user(&pool, "bob").await;
    let chat_id = MembershipLedger::create_chat(&pool, alice, "busy").await.unwrap().id;
    ChatLifecycle::add_user(&pool, chat_id, alice, bob).await.unwrap();

    let handles: Vec<_> = (0..40)
        .map(|i| {
            let pool = pool.clone();
            let sender = if i % 2 == 0 { alice } else { bob };
            tokio::spawn(async move {
                MessageLog::append(&pool, chat_id, sender, &format!("m{i}")).await
            })
        })
        .collect();
    for handle in handles {
        handle.await.expect("task panicked").expect("append failed");
    }

    let messages = MessageLog::list_by_chat(&pool, chat_id, alice).await.unwrap();
    assert_eq!(messages.len(), 42);
    for pair in messages.windows(2) {
        assert!(pair[0].created_at <= pair[1].created_at);
        assert_eq!(pair[0].seq + 1, pair[1].seq);
    }
}
