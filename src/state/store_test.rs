use std::sync::Arc;

use super::*;
use crate::models::GlobalPrompt;
use crate::storage::MockStorage;

fn storage_with_selection(selected: Option<i64>, prompt: Option<GlobalPrompt>) -> ArcStorage {
    let mut storage = MockStorage::new();
    storage
        .expect_get_selected_prompt()
        .returning(move |_| Ok(selected));
    storage
        .expect_get_global_prompt()
        .returning(move |_| Ok(prompt.clone()));
    Arc::new(storage)
}

#[test]
fn test_apply_system_prompt_inserts() {
    let mut messages = vec![ChatMessage::new_user("hi")];
    apply_system_prompt(&mut messages, "be nice");

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], ChatMessage::new_system("be nice"));
    assert_eq!(messages[1], ChatMessage::new_user("hi"));
}

#[test]
fn test_apply_system_prompt_overwrites() {
    let mut messages = vec![ChatMessage::new_system("old"), ChatMessage::new_user("hi")];
    apply_system_prompt(&mut messages, "new");

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content(), "new");
}

#[test]
fn test_apply_system_prompt_is_idempotent() {
    let mut messages = vec![];
    apply_system_prompt(&mut messages, "prompt");
    let once = messages.clone();
    apply_system_prompt(&mut messages, "prompt");

    assert_eq!(messages, once);
    assert_eq!(messages.iter().filter(|m| m.is_system()).count(), 1);
    assert!(messages[0].is_system());
}

#[test]
fn test_apply_preferred_prompt() {
    let mut context = ConversationContext::new("llama3");
    apply_preferred_prompt(&mut context, "persisted".to_string());
    assert_eq!(context.system_prompt(), Some("persisted"));

    context.set_session_prompt(Some("only code".to_string()));
    apply_preferred_prompt(&mut context, "persisted".to_string());
    assert_eq!(context.system_prompt(), Some("only code"));
    assert_eq!(context.messages().len(), 1);
}

#[test]
fn test_with_context_creates_lazily() {
    let store = ChatStore::new("llama3");
    assert!(store.get(1).is_none());

    store.with_context(1, |ctx| ctx.push_message(ChatMessage::new_user("hi")));

    let ctx = store.get(1).expect("context");
    assert_eq!(ctx.model(), "llama3");
    assert!(ctx.stream());
    assert_eq!(ctx.messages().len(), 1);
    assert!(ctx.active_session_id().is_none());
    assert!(!store.contains(2));
}

#[test]
fn test_set_and_with_lock() {
    let store = ChatStore::new("llama3");
    store.set(1, ConversationContext::new("mistral").with_session("s1"));
    store.set(2, ConversationContext::new("llama3"));

    let sessions = store.with_lock(|chats| {
        let mut sessions = chats
            .values()
            .filter_map(|c| c.active_session_id().map(str::to_string))
            .collect::<Vec<_>>();
        sessions.sort();
        sessions
    });
    assert_eq!(sessions, vec!["s1".to_string()]);
}

#[test]
fn test_set_default_model_updates_contexts() {
    let store = ChatStore::new("llama3");
    store.with_context(1, |_| ());
    store.set_default_model("mistral");

    assert_eq!(store.default_model(), "mistral");
    assert_eq!(store.get(1).map(|c| c.model().to_string()).as_deref(), Some("mistral"));
    store.with_context(2, |_| ());
    assert_eq!(store.get(2).map(|c| c.model().to_string()).as_deref(), Some("mistral"));
}

#[tokio::test]
async fn test_resolve_system_prompt_default() {
    let storage = storage_with_selection(None, None);
    let prompt = resolve_system_prompt(&storage, 1).await.unwrap();
    assert_eq!(prompt, PredefinedPrompt::default_prompt().prompt);
}

#[tokio::test]
async fn test_resolve_system_prompt_global() {
    let storage = storage_with_selection(
        Some(4),
        Some(GlobalPrompt {
            id: 4,
            name: "Pirate".to_string(),
            prompt: "Talk like a pirate.".to_string(),
        }),
    );
    let prompt = resolve_system_prompt(&storage, 1).await.unwrap();
    assert_eq!(prompt, "Talk like a pirate.");
}

#[tokio::test]
async fn test_resolve_system_prompt_deleted_selection() {
    let storage = storage_with_selection(Some(4), None);
    let prompt = resolve_system_prompt(&storage, 1).await.unwrap();
    assert_eq!(prompt, PredefinedPrompt::default_prompt().prompt);
}

#[tokio::test]
async fn test_ensure_system_prompt_twice() {
    let storage = storage_with_selection(None, None);
    let store = ChatStore::new("llama3");
    store.with_context(1, |ctx| ctx.push_message(ChatMessage::new_user("hi")));

    store.ensure_system_prompt(&storage, 1).await.unwrap();
    let once = store.get(1).unwrap().messages().to_vec();
    store.ensure_system_prompt(&storage, 1).await.unwrap();
    let twice = store.get(1).unwrap().messages().to_vec();

    assert_eq!(once, twice);
    assert_eq!(twice.len(), 2);
    assert_eq!(
        store.get(1).unwrap().system_prompt(),
        Some(PredefinedPrompt::default_prompt().prompt)
    );
}

#[tokio::test]
async fn test_ensure_system_prompt_keeps_session_prompt() {
    let storage = storage_with_selection(None, None);
    let store = ChatStore::new("llama3");
    store.with_context(1, |ctx| ctx.set_session_prompt(Some("only code".to_string())));

    store.ensure_system_prompt(&storage, 1).await.unwrap();
    assert_eq!(store.get(1).unwrap().system_prompt(), Some("only code"));
}
