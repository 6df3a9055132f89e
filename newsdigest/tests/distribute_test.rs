use common::{DistributionConfig, TelegramCredentials};
use mockito::Matcher;
use newsdigest::distribute::{distribute, Notifier, TelegramNotifier};
use newsdigest::format::OutputBlock;
use serde_json::json;

fn credentials() -> TelegramCredentials {
    TelegramCredentials {
        token: "123:secret".to_string(),
        chat_id: "-100200".to_string(),
    }
}

#[tokio::test]
async fn test_telegram_send_with_mock() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/bot123:secret/sendMessage")
        .match_body(Matcher::PartialJson(json!({
            "chat_id": "-100200",
            "text": "Dubai-News – 16. October 2026\n\n1. Title\nhttps://x.com/1"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok": true, "result": {"message_id": 7}}"#)
        .create_async()
        .await;

    let notifier = TelegramNotifier::new(server.url(), credentials(), 5).unwrap();
    let block = OutputBlock {
        header: "Dubai-News – 16. October 2026".to_string(),
        prefix: "1. ".to_string(),
        body: "Title\nhttps://x.com/1".to_string(),
    };

    let report = distribute(&notifier, &[block]).await;

    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_telegram_error_status_keeps_token_out_of_message() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/bot123:secret/sendMessage")
        .with_status(400)
        .with_body(r#"{"ok": false, "description": "Bad Request: chat not found"}"#)
        .create_async()
        .await;

    let notifier = TelegramNotifier::new(server.url(), credentials(), 5).unwrap();
    let err = notifier.send("hello").await.unwrap_err();
    let message = format!("{:#}", err);

    assert!(message.contains("400"));
    assert!(!message.contains("secret"));
}

#[tokio::test]
async fn test_telegram_ok_false_is_an_error() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/bot123:secret/sendMessage")
        .with_status(200)
        .with_body(r#"{"ok": false, "description": "Forbidden: bot was blocked"}"#)
        .create_async()
        .await;

    let notifier = TelegramNotifier::new(server.url(), credentials(), 5).unwrap();
    let err = notifier.send("hello").await.unwrap_err();

    assert!(err.to_string().contains("bot was blocked"));
}

#[tokio::test]
async fn test_unreachable_endpoint_keeps_token_out_of_message() {
    // nothing listens on port 9 on loopback
    let notifier = TelegramNotifier::new("http://127.0.0.1:9", credentials(), 2).unwrap();
    let err = notifier.send("hello").await.unwrap_err();

    assert!(!format!("{:#}", err).contains("secret"));
}

#[test]
fn test_absent_credentials_disable_distribution() {
    let cfg = DistributionConfig::default();

    assert!(cfg.credentials(|_| None).is_none());
    assert!(cfg
        .credentials(|k| (k == "TELEGRAM_BOT_TOKEN").then(|| "t".to_string()))
        .is_none());
    assert_eq!(
        cfg.credentials(|k| Some(format!("{k}-value"))),
        Some(TelegramCredentials {
            token: "TELEGRAM_BOT_TOKEN-value".to_string(),
            chat_id: "TELEGRAM_CHAT_ID-value".to_string(),
        })
    );
}
