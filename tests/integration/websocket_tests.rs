//! Socket-level tests against an in-process backend

#[path = "../support/fake_backend.rs"]
mod fake_backend;

use fake_backend::{FakeBackend, Script, FAKE_IMAGE_B64};
use gen_studio_client::form::ReferenceImage;
use gen_studio_client::session::{ProgressState, SessionUpdate};
use gen_studio_client::transport::{Connection, TransportEvent};
use gen_studio_client::{GenerationForm, GenerationSession, OutboundMessage};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn next_text(connection: &mut Connection) -> String {
    match tokio::time::timeout(TIMEOUT, connection.next_event()).await {
        Ok(TransportEvent::Text(text)) => text,
        other => panic!("expected a text frame, got {:?}", other),
    }
}

async fn open(backend: &FakeBackend, session: &mut GenerationSession) -> Connection {
    let mut connection = Connection::open(&backend.ws_url(), TIMEOUT).await.unwrap();
    session.on_open();
    let greeting = next_text(&mut connection).await;
    assert_eq!(session.handle_text(&greeting), SessionUpdate::Ready);
    connection
}

#[tokio::test]
async fn test_full_generation_cycle() {
    let backend = FakeBackend::start(Script::Complete).await;
    let mut session = GenerationSession::new(24);
    let mut connection = open(&backend, &mut session).await;

    let mut form = GenerationForm::default();
    form.set_prompt("a lighthouse in a storm");
    form.set_steps(24);
    form.set_guidance(7.0).unwrap();
    form.set_seed("");

    let message = session.submit(&form).unwrap();
    connection.send(&message).await.unwrap();
    assert!(session.is_busy());

    let update = session.handle_text(&next_text(&mut connection).await);
    assert_eq!(update, SessionUpdate::Started(ProgressState::new(0, 24)));

    let mut halfway_seen = false;
    loop {
        match session.handle_text(&next_text(&mut connection).await) {
            SessionUpdate::Progress(progress) => {
                if progress.step == 12 {
                    assert_eq!(progress.percent(), 50);
                    halfway_seen = true;
                }
                assert!(session.is_busy());
            }
            SessionUpdate::ImageReady => break,
            other => panic!("unexpected update {:?}", other),
        }
    }

    assert!(halfway_seen);
    assert!(!session.is_busy());
    assert!(session.progress().is_none());
    let image = session.image().unwrap();
    assert_eq!(image.base64(), FAKE_IMAGE_B64);
    assert_eq!(image.meta().unwrap().mode.as_deref(), Some("txt2img"));

    let received = backend.received().await;
    assert_eq!(received.len(), 1);
    let request = received[0].as_object().unwrap();
    assert_eq!(request["prompt"], "a lighthouse in a storm");
    assert_eq!(request["steps"], 24);
    assert_eq!(request["guidance"].as_f64(), Some(7.0));
    assert_eq!(request["seed"], "");
    assert!(!request.contains_key("image"));

    connection.close().await.unwrap();
}

#[tokio::test]
async fn test_reference_image_is_sent() {
    let backend = FakeBackend::start(Script::Complete).await;
    let mut session = GenerationSession::new(8);
    let mut connection = open(&backend, &mut session).await;

    let mut form = GenerationForm::default();
    form.set_prompt("same pose, winter outfit");
    form.set_steps(8);
    form.attach_reference(ReferenceImage::from_bytes(b"\x89PNG\r\n\x1a\nrest").unwrap());
    connection.send(&session.submit(&form).unwrap()).await.unwrap();

    while session.handle_text(&next_text(&mut connection).await) != SessionUpdate::ImageReady {}

    let received = backend.received().await;
    let image = received[0]["image"].as_str().unwrap();
    assert!(image.starts_with("data:image/png;base64,"));
    assert_eq!(
        session.image().unwrap().meta().unwrap().mode.as_deref(),
        Some("img2img")
    );
}

#[tokio::test]
async fn test_cancel_round_trip() {
    let backend = FakeBackend::start(Script::Stall).await;
    let mut session = GenerationSession::new(24);
    let mut connection = open(&backend, &mut session).await;

    let mut form = GenerationForm::default();
    form.set_prompt("slow render");
    connection.send(&session.submit(&form).unwrap()).await.unwrap();

    session.handle_text(&next_text(&mut connection).await);
    session.handle_text(&next_text(&mut connection).await);
    assert_eq!(session.progress(), Some(ProgressState::new(1, 24)));

    let cancel = session.cancel().unwrap();
    assert_eq!(cancel, OutboundMessage::Cancel);
    assert!(!session.is_busy());
    connection.send(&cancel).await.unwrap();

    let update = session.handle_text(&next_text(&mut connection).await);
    assert_eq!(update, SessionUpdate::Cancelled);
    assert!(session.image().is_none());

    let received = backend.received_at_least(2).await;
    assert_eq!(received.last().unwrap()["type"], "cancel");
}

#[tokio::test]
async fn test_backend_close_is_terminal() {
    let backend = FakeBackend::start(Script::Drop).await;
    let mut session = GenerationSession::new(24);
    let mut connection = open(&backend, &mut session).await;

    let mut form = GenerationForm::default();
    form.set_prompt("doomed");
    connection.send(&session.submit(&form).unwrap()).await.unwrap();
    session.handle_text(&next_text(&mut connection).await);

    let event = tokio::time::timeout(TIMEOUT, connection.next_event())
        .await
        .unwrap();
    assert!(matches!(event, TransportEvent::Closed(_)));
    session.on_close();

    assert!(!session.is_busy());
    assert!(connection.is_closed());
    assert!(connection.send(&OutboundMessage::Cancel).await.is_err());
    assert_eq!(session.submit(&form), Err(gen_studio_client::Rejection::NotConnected));
}
