use mockito::Matcher;
use serde_json::json;

use super::*;

const TOKEN: &str = "123:abc";

fn setup_client(url: &str) -> TelegramClient {
    TelegramClient::new(TOKEN)
        .with_endpoint(url)
        .with_poll_timeout(time::Duration::from_secs(1))
}

#[tokio::test]
async fn test_get_me() {
    let mut server = mockito::Server::new_async().await;
    let handler = server
        .mock("POST", "/bot123:abc/getMe")
        .with_status(200)
        .with_body(
            json!({
                "ok": true,
                "result": {"id": 42, "is_bot": true, "first_name": "Olla", "username": "olla_bot"}
            })
            .to_string(),
        )
        .expect(1)
        .create();

    let me = setup_client(&server.url())
        .get_me()
        .await
        .expect("Failed to get me");
    handler.assert();

    assert_eq!(me.id, 42);
    assert!(me.is_bot);
    assert_eq!(me.mention().as_deref(), Some("@olla_bot"));
}

#[tokio::test]
async fn test_get_updates() {
    let mut server = mockito::Server::new_async().await;
    let handler = server
        .mock("POST", "/bot123:abc/getUpdates")
        .match_body(Matcher::PartialJson(json!({
            "offset": 7,
            "timeout": 1,
            "allowed_updates": ["message"],
        })))
        .with_status(200)
        .with_body(
            json!({
                "ok": true,
                "result": [{
                    "update_id": 7,
                    "message": {
                        "message_id": 3,
                        "from": {"id": 5, "first_name": "Ann", "last_name": "Lee"},
                        "chat": {"id": 5, "type": "private"},
                        "text": "hello",
                        "reply_to_message": {
                            "message_id": 2,
                            "from": {"id": 42, "is_bot": true, "first_name": "Olla"},
                            "chat": {"id": 5, "type": "private"},
                            "text": "hi there"
                        }
                    }
                }, {
                    "update_id": 8,
                    "edited_message": {}
                }]
            })
            .to_string(),
        )
        .create();

    let updates = setup_client(&server.url())
        .get_updates(Some(7))
        .await
        .expect("Failed to get updates");
    handler.assert();

    assert_eq!(updates.len(), 2);
    let message = updates[0].message.as_ref().expect("message");
    assert_eq!(message.text_or_caption(), Some("hello"));
    assert_eq!(message.sender_id(), Some(5));
    assert!(message.chat.is_private());
    assert_eq!(message.from.as_ref().map(|u| u.full_name()).as_deref(), Some("Ann Lee"));
    let parent = message.reply_to_message.as_ref().expect("reply");
    assert_eq!(parent.text.as_deref(), Some("hi there"));
    assert!(updates[1].message.is_none());
}

#[tokio::test]
async fn test_send_message_markdown() {
    let mut server = mockito::Server::new_async().await;
    let handler = server
        .mock("POST", "/bot123:abc/sendMessage")
        .match_body(Matcher::PartialJson(json!({
            "chat_id": 5,
            "text": "`.`",
            "parse_mode": "Markdown",
        })))
        .with_status(200)
        .with_body(
            json!({
                "ok": true,
                "result": {"message_id": 99, "chat": {"id": 5, "type": "private"}, "text": "."}
            })
            .to_string(),
        )
        .expect(1)
        .create();

    let message_id = setup_client(&server.url())
        .send_message(5, "`.`")
        .await
        .expect("Failed to send message");
    handler.assert();
    assert_eq!(message_id, 99);
}

#[tokio::test]
async fn test_edit_message_error() {
    let mut server = mockito::Server::new_async().await;
    let _handler = server
        .mock("POST", "/bot123:abc/editMessageText")
        .with_status(400)
        .with_body(
            json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: message to edit not found"
            })
            .to_string(),
        )
        .create();

    let err = setup_client(&server.url())
        .edit_message(5, 99, "text")
        .await
        .expect_err("edit should fail");

    match err.downcast_ref::<TelegramError>() {
        Some(TelegramError::Api { code, description }) => {
            assert_eq!(*code, 400);
            assert!(description.contains("message to edit not found"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_edit_message_accepts_true_result() {
    let mut server = mockito::Server::new_async().await;
    let _handler = server
        .mock("POST", "/bot123:abc/editMessageText")
        .with_status(200)
        .with_body(json!({"ok": true, "result": true}).to_string())
        .create();

    setup_client(&server.url())
        .edit_message(5, 99, "text")
        .await
        .expect("Failed to edit message");
}

#[tokio::test]
async fn test_send_plain_has_no_parse_mode() {
    let mut server = mockito::Server::new_async().await;
    let handler = server
        .mock("POST", "/bot123:abc/sendMessage")
        .match_body(Matcher::Json(json!({
            "chat_id": 5,
            "text": "Something went wrong: boom",
        })))
        .with_status(200)
        .with_body(
            json!({
                "ok": true,
                "result": {"message_id": 100, "chat": {"id": 5, "type": "private"}}
            })
            .to_string(),
        )
        .expect(1)
        .create();

    setup_client(&server.url())
        .send_plain(5, "Something went wrong: boom")
        .await
        .expect("Failed to send message");
    handler.assert();
}

#[tokio::test]
async fn test_edit_plain_has_no_parse_mode() {
    let mut server = mockito::Server::new_async().await;
    let handler = server
        .mock("POST", "/bot123:abc/editMessageText")
        .match_body(Matcher::Json(json!({
            "chat_id": 5,
            "message_id": 99,
            "text": "use *ptr here",
        })))
        .with_status(200)
        .with_body(json!({"ok": true, "result": true}).to_string())
        .expect(1)
        .create();

    setup_client(&server.url())
        .edit_plain(5, 99, "use *ptr here")
        .await
        .expect("Failed to edit message");
    handler.assert();
}

#[tokio::test]
async fn test_download_file() {
    let mut server = mockito::Server::new_async().await;
    let _file_handler = server
        .mock("POST", "/bot123:abc/getFile")
        .match_body(Matcher::PartialJson(json!({"file_id": "photo-1"})))
        .with_status(200)
        .with_body(
            json!({
                "ok": true,
                "result": {"file_id": "photo-1", "file_path": "photos/file_1.jpg"}
            })
            .to_string(),
        )
        .create();
    let download_handler = server
        .mock("GET", "/file/bot123:abc/photos/file_1.jpg")
        .with_status(200)
        .with_body(vec![1u8, 2, 3])
        .expect(1)
        .create();

    let bytes = setup_client(&server.url())
        .download_file("photo-1")
        .await
        .expect("Failed to download file");
    download_handler.assert();
    assert_eq!(bytes, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_download_file_without_path() {
    let mut server = mockito::Server::new_async().await;
    let _handler = server
        .mock("POST", "/bot123:abc/getFile")
        .with_status(200)
        .with_body(json!({"ok": true, "result": {"file_id": "photo-1"}}).to_string())
        .create();

    let err = setup_client(&server.url())
        .download_file("photo-1")
        .await
        .expect_err("download should fail");
    assert!(matches!(
        err.downcast_ref::<TelegramError>(),
        Some(TelegramError::MissingFilePath(_))
    ));
}

#[test]
fn test_from_config() {
    let config = TelegramConfig {
        token: TOKEN.to_string(),
        endpoint: "http://telegram.local/".to_string(),
        admin_ids: vec![1],
        allow_all_users_in_groups: false,
        poll_timeout_secs: 20,
    };

    let client = TelegramClient::from(&config);
    assert_eq!(client.endpoint(), "http://telegram.local");
    assert_eq!(client.poll_timeout(), time::Duration::from_secs(20));
}
