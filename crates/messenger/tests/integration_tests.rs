//! Integration tests for the messenger crate.
//!
//! Webhook parsing runs against captured delivery bodies. The live Send API
//! test needs a page token and a user that has messaged the page:
//!   PAGE_ACCESS_TOKEN=.. TEST_RECIPIENT_ID=.. cargo test --test integration_tests -- --ignored

use messenger::{
    EventKind, GraphConfig, MessagePayload, MessengerClient, QuickReplyButton, SenderAction,
    WebhookBody,
};
use std::env;

fn parse(body: &str) -> WebhookBody {
    serde_json::from_str(body).unwrap()
}

// ============================================================================
// Captured webhook deliveries
// ============================================================================

mod webhook_tests {
    use super::*;

    const TEXT_MESSAGE: &str = r#"{
        "object": "page",
        "entry": [{
            "id": "1111",
            "time": 1496829600000,
            "messaging": [{
                "sender": { "id": "2222" },
                "recipient": { "id": "1111" },
                "timestamp": 1496829599000,
                "message": { "mid": "mid.$cAAA", "seq": 7, "text": "sunset" }
            }]
        }]
    }"#;

    const IMAGE_AND_AUDIO: &str = r#"{
        "object": "page",
        "entry": [{
            "id": "1111",
            "time": 1496829600000,
            "messaging": [{
                "sender": { "id": "2222" },
                "recipient": { "id": "1111" },
                "timestamp": 1496829599000,
                "message": {
                    "mid": "mid.$cBBB",
                    "attachments": [
                        { "type": "image", "payload": { "url": "https://scontent.example.net/v/t1/123_456_n.jpg?_nc_ad=z" } },
                        { "type": "audio", "payload": { "url": "https://cdn.example.net/clip.mp4" } }
                    ]
                }
            }]
        }]
    }"#;

    const MIXED_BATCH: &str = r#"{
        "object": "page",
        "entry": [
            {
                "id": "1111",
                "time": 1496829600000,
                "messaging": [
                    { "sender": { "id": "2222" }, "recipient": { "id": "1111" }, "timestamp": 1, "delivery": { "mids": ["mid.$x"], "watermark": 1 } },
                    { "sender": { "id": "2222" }, "recipient": { "id": "1111" }, "timestamp": 2, "read": { "watermark": 2 } },
                    { "sender": { "id": "1111" }, "recipient": { "id": "2222" }, "timestamp": 3, "message": { "mid": "mid.$echo", "is_echo": true, "text": "Hi!" } },
                    { "sender": { "id": "2222" }, "recipient": { "id": "1111" }, "timestamp": 4, "message": { "mid": "mid.$qr", "text": "new report", "quick_reply": { "payload": "{\"signal\":\"INSERT_NEW\"}" } } }
                ]
            },
            {
                "id": "1111",
                "time": 1496829600001,
                "messaging": [
                    { "sender": { "id": "3333" }, "recipient": { "id": "1111" }, "timestamp": 5, "postback": { "title": "view more", "payload": "{\"signal\":\"RECENT_REPORT\"}" } }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_text_message() {
        let events = parse(TEXT_MESSAGE).events();
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.sender_id, "2222");
        assert_eq!(event.mid.as_deref(), Some("mid.$cAAA"));
        assert_eq!(event.kind, EventKind::Text("sunset".to_string()));
        assert!(event.raw.contains("mid.$cAAA"));
    }

    #[test]
    fn test_attachments() {
        let events = parse(IMAGE_AND_AUDIO).events();
        let EventKind::Attachments(attachments) = &events[0].kind else {
            panic!("expected attachments");
        };

        assert_eq!(attachments.len(), 2);
        assert!(attachments[0].is_media());
        assert_eq!(attachments[0].file_name().as_deref(), Some("123_456_n.jpg"));
        assert!(!attachments[1].is_media());
    }

    #[test]
    fn test_mixed_batch_keeps_only_user_actions() {
        let events = parse(MIXED_BATCH).events();
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].sender_id, "2222");
        assert_eq!(
            events[0].kind,
            EventKind::QuickReply("{\"signal\":\"INSERT_NEW\"}".to_string())
        );

        assert_eq!(events[1].sender_id, "3333");
        assert_eq!(events[1].mid.as_deref(), Some("3333.5"));
        assert_eq!(
            events[1].kind,
            EventKind::Postback("{\"signal\":\"RECENT_REPORT\"}".to_string())
        );
    }

    #[test]
    fn test_non_page_object() {
        let body = TEXT_MESSAGE.replace("\"page\"", "\"instagram\"");
        assert!(parse(&body).events().is_empty());
    }

    #[test]
    fn test_empty_body() {
        assert!(parse("{}").events().is_empty());
    }
}

// ============================================================================
// Config
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_graph_config_default() {
        let config = GraphConfig::default();
        assert_eq!(config.base_url, "https://graph.facebook.com/v2.8");
        assert!(config.page_access_token.is_empty());
    }

    #[test]
    fn test_messages_url() {
        let config = GraphConfig::new("http://127.0.0.1:9000/v2.8/", "t");
        assert_eq!(config.messages_url(), "http://127.0.0.1:9000/v2.8/me/messages");
    }
}

// ============================================================================
// Live Send API (ignored by default)
// ============================================================================

#[tokio::test]
#[ignore = "requires PAGE_ACCESS_TOKEN and TEST_RECIPIENT_ID"]
async fn test_live_send() {
    dotenvy::dotenv().ok();
    let (Ok(token), Ok(recipient)) = (env::var("PAGE_ACCESS_TOKEN"), env::var("TEST_RECIPIENT_ID"))
    else {
        eprintln!("Skipping: PAGE_ACCESS_TOKEN or TEST_RECIPIENT_ID not set");
        return;
    };

    let client = MessengerClient::new(GraphConfig::with_token(token)).unwrap();
    client
        .send_sender_action(&recipient, SenderAction::TypingOn)
        .await
        .unwrap();

    let message = MessagePayload::text("integration test")
        .with_quick_replies(vec![QuickReplyButton::text("ok", "{}")]);
    let response = client.send_message(&recipient, message).await.unwrap();
    assert!(response.message_id.is_some());
}
