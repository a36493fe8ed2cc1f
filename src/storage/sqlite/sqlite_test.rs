use super::*;

async fn setup_db() -> Sqlite {
    Sqlite::new(None).await.expect("Failed to open database")
}

#[test]
fn test_approximate_tokens() {
    assert_eq!(approximate_tokens(""), 0);
    assert_eq!(approximate_tokens("one"), 1);
    assert_eq!(approximate_tokens("one two three"), 3);
    assert_eq!(approximate_tokens("a b c d e f g h i j"), 13);
}

#[tokio::test]
async fn test_save_turn_without_session() {
    let db = setup_db().await;
    db.save_turn(1, None, Role::User, "hello").await.unwrap();

    let count = db
        .conn
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT COUNT(*) FROM chats")?;
            let mut rows = stmt.query([])?;
            let count: i64 = match rows.next()? {
                Some(row) => row.get(0)?,
                None => 0,
            };
            Ok(count)
        })
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_load_recent_turns() {
    let db = setup_db().await;
    let session = db.create_session(1, "work").await.unwrap();
    let sid = Some(session.id.clone());

    db.save_turn(1, sid.clone(), Role::User, "first question here")
        .await
        .unwrap();
    db.save_turn(1, sid.clone(), Role::Assistant, "first answer")
        .await
        .unwrap();
    db.save_turn(1, sid.clone(), Role::User, "second").await.unwrap();
    db.save_turn(1, sid.clone(), Role::Assistant, "second answer")
        .await
        .unwrap();

    let turns = db.load_recent_turns(&session.id, 4096).await.unwrap();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0], Turn::new(Role::User, "first question here"));
    assert_eq!(turns[3], Turn::new(Role::Assistant, "second answer"));

    // "second answer" costs 2 tokens, "second" 1 and "first answer" 2.
    let turns = db.load_recent_turns(&session.id, 4).await.unwrap();
    assert_eq!(
        turns,
        vec![
            Turn::new(Role::User, "second"),
            Turn::new(Role::Assistant, "second answer"),
        ]
    );

    let turns = db.load_recent_turns(&session.id, 0).await.unwrap();
    assert!(turns.is_empty());

    let turns = db.load_recent_turns("unknown", 4096).await.unwrap();
    assert!(turns.is_empty());
}

#[tokio::test]
async fn test_selected_prompt() {
    let db = setup_db().await;
    assert_eq!(db.get_selected_prompt(7).await.unwrap(), None);
    assert!(!db.is_user_allowed(7).await.unwrap());

    db.set_selected_prompt(7, Some(3)).await.unwrap();
    assert_eq!(db.get_selected_prompt(7).await.unwrap(), Some(3));

    let users = db.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "User 7");

    db.set_selected_prompt(7, None).await.unwrap();
    assert_eq!(db.get_selected_prompt(7).await.unwrap(), None);
}

#[tokio::test]
async fn test_users() {
    let db = setup_db().await;

    assert!(db.add_user(10, "Ann").await.unwrap());
    assert!(!db.add_user(10, "Ann again").await.unwrap());
    assert!(db.add_user(11, "Bob").await.unwrap());
    assert!(db.is_user_allowed(10).await.unwrap());

    let users = db.list_users().await.unwrap();
    assert_eq!(
        users,
        vec![
            AllowedUser {
                id: 10,
                name: "Ann".to_string(),
                selected_prompt_id: None,
            },
            AllowedUser {
                id: 11,
                name: "Bob".to_string(),
                selected_prompt_id: None,
            },
        ]
    );

    assert!(db.remove_user(10).await.unwrap());
    assert!(!db.remove_user(10).await.unwrap());
    assert!(!db.is_user_allowed(10).await.unwrap());
}

#[tokio::test]
async fn test_global_prompts() {
    let db = setup_db().await;

    let pirate = db
        .add_global_prompt("Pirate", "Talk like a pirate.")
        .await
        .unwrap();
    let poet = db.add_global_prompt("Poet", "Answer in verse.").await.unwrap();
    assert_ne!(pirate, poet);

    let prompts = db.list_global_prompts().await.unwrap();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0].name, "Pirate");
    assert_eq!(prompts[1].prompt, "Answer in verse.");

    let prompt = db.get_global_prompt(poet).await.unwrap();
    assert_eq!(prompt.map(|p| p.name), Some("Poet".to_string()));

    db.set_selected_prompt(1, Some(pirate)).await.unwrap();
    assert!(db.delete_global_prompt(pirate).await.unwrap());
    assert!(!db.delete_global_prompt(pirate).await.unwrap());
    assert_eq!(db.get_global_prompt(pirate).await.unwrap(), None);
    assert_eq!(db.get_selected_prompt(1).await.unwrap(), None);
}

#[tokio::test]
async fn test_sessions() {
    let db = setup_db().await;

    let first = db.create_session(1, "first").await.unwrap();
    let second = db.create_session(1, "second").await.unwrap();
    db.create_session(2, "other user").await.unwrap();
    assert_ne!(first.id, second.id);

    let sessions = db.list_sessions(1).await.unwrap();
    assert_eq!(sessions, vec![second.clone(), first.clone()]);

    assert_eq!(db.get_session(1, &first.id).await.unwrap(), Some(first.clone()));
    assert_eq!(db.get_session(2, &first.id).await.unwrap(), None);

    db.save_turn(1, Some(first.id.clone()), Role::User, "hello")
        .await
        .unwrap();

    // Sessions of other users are left alone.
    assert!(!db.delete_session(2, &first.id).await.unwrap());
    assert!(db.delete_session(1, &first.id).await.unwrap());
    assert!(db.load_recent_turns(&first.id, 4096).await.unwrap().is_empty());
    assert_eq!(db.list_sessions(1).await.unwrap(), vec![second]);
}
