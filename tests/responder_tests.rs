//! Poll cycle behaviour against a mocked mailbox

mod common;

use common::{create_test_message, test_config, MockMailbox};
use gmail_autoresponder::error::GmailError;
use gmail_autoresponder::models::{CycleOutcome, IncomingMessage};
use gmail_autoresponder::responder::AutoResponder;
use mockall::Sequence;

#[tokio::test]
async fn test_no_unread_mail_does_nothing() {
    let mut mock = MockMailbox::new();

    mock.expect_list_message_ids()
        .withf(|query, max_results| query == "is:unread" && *max_results == 1)
        .times(1)
        .returning(|_, _| Ok(vec![]));
    mock.expect_get_message().never();
    mock.expect_send_reply().never();
    mock.expect_modify_labels().never();

    let responder = AutoResponder::new(mock, &test_config());
    let outcome = responder.run_cycle().await.unwrap();

    assert_eq!(outcome, CycleOutcome::NoNewMessage);
}

#[tokio::test]
async fn test_idle_cycle_without_logging_still_reports_no_message() {
    let mut config = test_config();
    config.poll.log_when_idle = false;

    let mut mock = MockMailbox::new();
    mock.expect_list_message_ids()
        .times(1)
        .returning(|_, _| Ok(vec![]));
    mock.expect_send_reply().never();

    let responder = AutoResponder::new(mock, &config);
    assert_eq!(
        responder.run_cycle().await.unwrap(),
        CycleOutcome::NoNewMessage
    );
}

#[tokio::test]
async fn test_replies_to_sender_and_marks_read() {
    let mut mock = MockMailbox::new();
    let mut seq = Sequence::new();

    mock.expect_list_message_ids()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(vec!["18c2f0a1".to_string()]));

    mock.expect_get_message()
        .withf(|id| id == "18c2f0a1")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|id| Ok(create_test_message(id, "Jane Doe <jane@example.com>")));

    mock.expect_send_reply()
        .withf(|reply| {
            reply.header("To") == Some("Jane Doe <jane@example.com>")
                && reply.header("In-Reply-To") == Some("18c2f0a1")
                && reply.header("References") == Some("18c2f0a1")
                && reply.header("From") == Some("Jordan Lee")
                && reply.header("Subject") == Some("no-reply")
                && reply.thread_id.as_deref() == Some("thread_18c2f0a1")
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("sent-1".to_string()));

    mock.expect_modify_labels()
        .withf(|id, add, remove| {
            id == "18c2f0a1" && add == ["INBOX".to_string()] && remove == ["UNREAD".to_string()]
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(()));

    let responder = AutoResponder::new(mock, &test_config());
    let outcome = responder.run_cycle().await.unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Replied {
            message_id: "18c2f0a1".to_string(),
            recipient: "Jane Doe <jane@example.com>".to_string(),
            sent_id: "sent-1".to_string(),
        }
    );
}

#[tokio::test]
async fn test_only_first_listed_message_is_handled() {
    let mut mock = MockMailbox::new();

    mock.expect_list_message_ids()
        .times(1)
        .returning(|_, _| Ok(vec!["newest".to_string(), "older".to_string()]));
    mock.expect_get_message()
        .withf(|id| id == "newest")
        .times(1)
        .returning(|id| Ok(create_test_message(id, "a@example.com")));
    mock.expect_send_reply()
        .times(1)
        .returning(|_| Ok("sent".to_string()));
    mock.expect_modify_labels()
        .withf(|id, _, _| id == "newest")
        .times(1)
        .returning(|_, _, _| Ok(()));

    let responder = AutoResponder::new(mock, &test_config());
    responder.run_cycle().await.unwrap();
}

#[tokio::test]
async fn test_sender_address_is_used_verbatim() {
    let from = "\"Doe, Jane\" <jane+filter@example.co.uk>";
    let mut mock = MockMailbox::new();

    mock.expect_list_message_ids()
        .returning(|_, _| Ok(vec!["m1".to_string()]));
    mock.expect_get_message()
        .returning(move |id| Ok(create_test_message(id, from)));
    mock.expect_send_reply()
        .withf(move |reply| reply.to == from && reply.header("To") == Some(from))
        .times(1)
        .returning(|_| Ok("sent".to_string()));
    mock.expect_modify_labels().returning(|_, _, _| Ok(()));

    let responder = AutoResponder::new(mock, &test_config());
    responder.run_cycle().await.unwrap();
}

#[tokio::test]
async fn test_send_failure_leaves_message_unread() {
    let mut mock = MockMailbox::new();

    mock.expect_list_message_ids()
        .returning(|_, _| Ok(vec!["m1".to_string()]));
    mock.expect_get_message()
        .returning(|id| Ok(create_test_message(id, "a@example.com")));
    mock.expect_send_reply()
        .times(1)
        .returning(|_| Err(GmailError::SendError("quota exceeded".to_string())));
    mock.expect_modify_labels().never();

    let responder = AutoResponder::new(mock, &test_config());
    let result = responder.run_cycle().await;

    assert!(matches!(result, Err(GmailError::SendError(_))));
}

#[tokio::test]
async fn test_missing_from_header_sends_nothing() {
    let mut mock = MockMailbox::new();

    mock.expect_list_message_ids()
        .returning(|_, _| Ok(vec!["m1".to_string()]));
    mock.expect_get_message().returning(|id| {
        Ok(IncomingMessage {
            id: id.to_string(),
            thread_id: None,
            from: None,
            subject: Some("no sender".to_string()),
            message_id: None,
        })
    });
    mock.expect_send_reply().never();
    mock.expect_modify_labels().never();

    let responder = AutoResponder::new(mock, &test_config());
    let result = responder.run_cycle().await;

    assert!(matches!(result, Err(GmailError::InvalidMessageFormat(_))));
}

#[tokio::test]
async fn test_list_failure_stops_cycle() {
    let mut mock = MockMailbox::new();

    mock.expect_list_message_ids()
        .returning(|_, _| Err(GmailError::AuthError("token revoked".to_string())));
    mock.expect_get_message().never();
    mock.expect_send_reply().never();

    let responder = AutoResponder::new(mock, &test_config());
    assert!(matches!(
        responder.run_cycle().await,
        Err(GmailError::AuthError(_))
    ));
}

#[tokio::test]
async fn test_relabel_failure_after_send_is_reported() {
    let mut mock = MockMailbox::new();

    mock.expect_list_message_ids()
        .returning(|_, _| Ok(vec!["m1".to_string()]));
    mock.expect_get_message()
        .returning(|id| Ok(create_test_message(id, "a@example.com")));
    mock.expect_send_reply()
        .times(1)
        .returning(|_| Ok("sent".to_string()));
    mock.expect_modify_labels()
        .times(1)
        .returning(|_, _, _| {
            Err(GmailError::ServerError {
                status: 503,
                message: "unavailable".to_string(),
            })
        });

    let responder = AutoResponder::new(mock, &test_config());
    let result = responder.run_cycle().await;

    match result {
        Err(GmailError::LabelError(msg)) => assert!(msg.contains("m1")),
        other => panic!("expected LabelError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_configured_query_and_labels_are_used() {
    let mut config = test_config();
    config.poll.query = "is:unread -from:me".to_string();
    config.labels.add = vec!["Label_42".to_string()];
    config.labels.remove = vec!["UNREAD".to_string(), "INBOX".to_string()];

    let mut mock = MockMailbox::new();
    mock.expect_list_message_ids()
        .withf(|query, _| query == "is:unread -from:me")
        .returning(|_, _| Ok(vec!["m1".to_string()]));
    mock.expect_get_message()
        .returning(|id| Ok(create_test_message(id, "a@example.com")));
    mock.expect_send_reply()
        .returning(|_| Ok("sent".to_string()));
    mock.expect_modify_labels()
        .withf(|_, add, remove| {
            add == ["Label_42".to_string()]
                && remove == ["UNREAD".to_string(), "INBOX".to_string()]
        })
        .times(1)
        .returning(|_, _, _| Ok(()));

    let responder = AutoResponder::new(mock, &config);
    responder.run_cycle().await.unwrap();
}
