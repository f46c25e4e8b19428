//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! MudLink tests against a fake MUD server on the loopback interface

use mudbridge_gateway::config::BridgeSettings;
use mudbridge_gateway::link::{LinkEvent, LinkStatus, MudLink};
use mudbridge_gateway::telnet::WindowSize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

const HOST: &str = "127.0.0.1";
const OPENING_OFFER: [u8; 9] = [255, 251, 3, 255, 253, 1, 255, 251, 31];
const WAIT: Duration = Duration::from_secs(5);

async fn fake_mud() -> (TcpListener, u16) {
    let listener = TcpListener::bind((HOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

async fn dead_port() -> u16 {
    let (listener, port) = fake_mud().await;
    drop(listener);
    port
}

fn new_link(ports: Vec<u16>) -> (MudLink, mpsc::UnboundedReceiver<LinkEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let settings = Arc::new(BridgeSettings::new(HOST, ports));
    (MudLink::new(settings, tx), rx)
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<LinkEvent>) -> LinkEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for link event")
        .expect("link event channel closed")
}

async fn assert_quiet(events: &mut mpsc::UnboundedReceiver<LinkEvent>) {
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(events.try_recv().is_err());
}

async fn accept(listener: &TcpListener) -> TcpStream {
    let (mut stream, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    let mut offer = [0u8; 9];
    stream.read_exact(&mut offer).await.unwrap();
    assert_eq!(offer, OPENING_OFFER);
    stream
}

async fn connect(
    link: &mut MudLink,
    events: &mut mpsc::UnboundedReceiver<LinkEvent>,
    listener: &TcpListener,
    port: u16,
) -> TcpStream {
    link.connect(port);
    let server = accept(listener).await;
    assert_eq!(
        next_event(events).await,
        LinkEvent::Status(LinkStatus::Connecting {
            host: HOST.to_string(),
            port
        })
    );
    assert_eq!(
        next_event(events).await,
        LinkEvent::Status(LinkStatus::Connected {
            host: HOST.to_string(),
            port
        })
    );
    server
}

async fn collect_data(events: &mut mpsc::UnboundedReceiver<LinkEvent>, len: usize) -> Vec<u8> {
    let mut data = Vec::new();
    while data.len() < len {
        match next_event(events).await {
            LinkEvent::Data(bytes) => data.extend_from_slice(&bytes),
            other => panic!("unexpected event {:?}", other),
        }
    }
    data
}

#[tokio::test]
async fn test_connect_rejects_disallowed_port() {
    let (mut link, mut events) = new_link(vec![5002, 5003]);
    link.connect(9999);

    match next_event(&mut events).await {
        LinkEvent::Error(message) => {
            assert_eq!(message, "Invalid port: 9999. Must be one of: 5002, 5003")
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(link.requested_port().is_none());
    assert_quiet(&mut events).await;
}

#[tokio::test]
async fn test_connect_reports_status_and_sends_opening_offer() {
    let (listener, port) = fake_mud().await;
    let (mut link, mut events) = new_link(vec![port]);

    let _server = connect(&mut link, &mut events, &listener, port).await;
    assert!(link.is_connected());
    assert_eq!(link.current_port(), Some(port));
}

#[tokio::test]
async fn test_negotiation_reply_and_data() {
    let (listener, port) = fake_mud().await;
    let (mut link, mut events) = new_link(vec![port]);
    let mut server = connect(&mut link, &mut events, &listener, port).await;

    server.write_all(&[255, 253, 31, b'h', b'i']).await.unwrap();

    assert_eq!(collect_data(&mut events, 2).await, b"hi".to_vec());

    let mut reply = [0u8; 12];
    server.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [255, 251, 31, 255, 250, 31, 0, 80, 0, 24, 255, 240]);

    assert_eq!(link.session_log().snapshot().concat(), "fffd1f6869");
}

#[tokio::test]
async fn test_session_log_records_command_only_chunks() {
    let (listener, port) = fake_mud().await;
    let (mut link, mut events) = new_link(vec![port]);
    let mut server = connect(&mut link, &mut events, &listener, port).await;

    server.write_all(&[255, 251, 1]).await.unwrap();
    let mut reply = [0u8; 3];
    server.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, [255, 253, 1]);

    assert_eq!(link.session_log().snapshot(), vec!["fffb01".to_string()]);
    assert_quiet(&mut events).await;
}

#[tokio::test]
async fn test_send_and_resize() {
    let (listener, port) = fake_mud().await;
    let (mut link, mut events) = new_link(vec![port]);
    let mut server = connect(&mut link, &mut events, &listener, port).await;

    link.send(b"look\r\n".to_vec());
    link.send_resize(120, 40);

    let mut received = [0u8; 15];
    server.read_exact(&mut received).await.unwrap();
    assert_eq!(&received[..6], b"look\r\n");
    assert_eq!(&received[6..], &[255, 250, 31, 0, 120, 0, 40, 255, 240]);
}

#[tokio::test]
async fn test_send_without_connection_is_noop() {
    let (mut link, mut events) = new_link(vec![5002]);
    link.send(b"look\n".to_vec());
    link.send_resize(80, 24);
    assert!(!link.is_connected());
    assert_quiet(&mut events).await;

    link.close();
    link.send(b"look\n".to_vec());
    assert_quiet(&mut events).await;
}

#[tokio::test]
async fn test_peer_hangup_reports_disconnect_once() {
    let (listener, port) = fake_mud().await;
    let (mut link, mut events) = new_link(vec![port]);
    let server = connect(&mut link, &mut events, &listener, port).await;

    drop(server);

    assert_eq!(
        next_event(&mut events).await,
        LinkEvent::Status(LinkStatus::Disconnect)
    );
    assert_quiet(&mut events).await;
    assert!(!link.is_connected());
    assert_eq!(link.current_port(), None);

    // Tearing down the dead socket must not report it again
    link.close();
    assert_quiet(&mut events).await;
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let (listener, port) = fake_mud().await;
    let (mut link, mut events) = new_link(vec![port]);
    let mut server = connect(&mut link, &mut events, &listener, port).await;

    link.close();
    link.close();
    assert!(link.is_closed());
    assert!(!link.is_connected());

    // The socket is destroyed, the server sees EOF or a reset
    let mut buffer = [0u8; 16];
    let read = timeout(WAIT, server.read(&mut buffer)).await.unwrap();
    assert!(matches!(read, Ok(0) | Err(_)));

    assert_quiet(&mut events).await;
}

#[tokio::test]
async fn test_connect_after_close_is_rejected() {
    let (listener, port) = fake_mud().await;
    let (mut link, mut events) = new_link(vec![port]);
    link.close();
    link.connect(port);

    assert_eq!(
        next_event(&mut events).await,
        LinkEvent::Error("Connection is closed".to_string())
    );
    assert!(timeout(Duration::from_millis(200), listener.accept()).await.is_err());
}

#[tokio::test]
async fn test_connect_failure_leaves_link_reusable() {
    let refused = dead_port().await;
    let (listener, port) = fake_mud().await;
    let (mut link, mut events) = new_link(vec![refused, port]);

    link.connect(refused);
    assert!(matches!(
        next_event(&mut events).await,
        LinkEvent::Status(LinkStatus::Connecting { .. })
    ));
    match next_event(&mut events).await {
        LinkEvent::ConnectFailed { port, message } => {
            assert_eq!(port, refused);
            assert!(message.starts_with(&format!("Failed to connect to port {}: ", refused)));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(
        next_event(&mut events).await,
        LinkEvent::Status(LinkStatus::Disconnect)
    );
    assert!(!link.is_connected());

    let _server = connect(&mut link, &mut events, &listener, port).await;
    assert!(link.is_connected());
}

#[tokio::test]
async fn test_reconnect_replaces_socket() {
    let (first_listener, first) = fake_mud().await;
    let (second_listener, second) = fake_mud().await;
    let (mut link, mut events) = new_link(vec![first, second]);

    let mut old = connect(&mut link, &mut events, &first_listener, first).await;

    link.connect(second);
    assert_eq!(
        next_event(&mut events).await,
        LinkEvent::Status(LinkStatus::Disconnect)
    );
    let _server = accept(&second_listener).await;
    assert!(matches!(
        next_event(&mut events).await,
        LinkEvent::Status(LinkStatus::Connecting { port, .. }) if port == second
    ));
    assert!(matches!(
        next_event(&mut events).await,
        LinkEvent::Status(LinkStatus::Connected { port, .. }) if port == second
    ));

    let mut buffer = [0u8; 16];
    let read = timeout(WAIT, old.read(&mut buffer)).await.unwrap();
    assert!(matches!(read, Ok(0) | Err(_)));
    assert_eq!(link.current_port(), Some(second));
    assert_quiet(&mut events).await;
}

#[tokio::test]
async fn test_window_size_recorded_before_connect() {
    let (listener, port) = fake_mud().await;
    let (mut link, mut events) = new_link(vec![port]);

    link.send_resize(100, 30);
    assert_eq!(link.window_size(), WindowSize::new(100, 30));
    assert_quiet(&mut events).await;

    let mut server = connect(&mut link, &mut events, &listener, port).await;
    server.write_all(&[255, 253, 31]).await.unwrap();

    // Nothing was written before the connection existed, so the reply comes first
    let mut reply = [0u8; 12];
    timeout(WAIT, server.read_exact(&mut reply))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply, [255, 251, 31, 255, 250, 31, 0, 100, 0, 30, 255, 240]);
}

#[tokio::test]
async fn test_reconnect_while_streaming_drops_old_events() {
    let (first_listener, first) = fake_mud().await;
    let (second_listener, second) = fake_mud().await;
    let (mut link, mut events) = new_link(vec![first, second]);

    let mut old = connect(&mut link, &mut events, &first_listener, first).await;
    tokio::spawn(async move {
        while old.write_all(b"aaaa").await.is_ok() {
            tokio::task::yield_now().await;
        }
    });
    assert!(matches!(next_event(&mut events).await, LinkEvent::Data(_)));

    link.connect(second);
    let mut server = accept(&second_listener).await;
    server.write_all(b"bbbb").await.unwrap();

    // Old output may precede the switch, never follow it
    loop {
        match next_event(&mut events).await {
            LinkEvent::Status(LinkStatus::Connecting { port, .. }) if port == second => break,
            LinkEvent::Data(_) | LinkEvent::Status(LinkStatus::Disconnect) => {}
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert!(matches!(
        next_event(&mut events).await,
        LinkEvent::Status(LinkStatus::Connected { port, .. }) if port == second
    ));

    let data = collect_data(&mut events, 4).await;
    assert_eq!(data, b"bbbb".to_vec());
    assert_quiet(&mut events).await;
}
