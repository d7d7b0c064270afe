//! Scratch storage must be released however a connection ends.

mod common;

use common::*;

#[tokio::test]
async fn scratch_removed_after_clean_disconnect() {
    let server = spawn_server(ServerOptions::default()).await;
    let root = server.scratch_root.path();
    let mut ws = connect(server.addr).await;

    send(&mut ws, audio_event(2048)).await;
    turn_events(&mut ws).await;
    wait_for_entries(root, 1).await;

    let scratch = std::fs::read_dir(root)
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    // one input, one output
    assert_eq!(entries(&scratch), 2);

    ws.close(None).await.unwrap();
    wait_for_entries(root, 0).await;
}

#[tokio::test]
async fn scratch_removed_after_abrupt_disconnect() {
    let server = spawn_server(ServerOptions::default()).await;
    let root = server.scratch_root.path();
    let mut ws = connect(server.addr).await;

    send(&mut ws, audio_event(2048)).await;
    turn_events(&mut ws).await;
    wait_for_entries(root, 1).await;

    drop(ws);
    wait_for_entries(root, 0).await;
}

#[tokio::test]
async fn scratch_removed_after_panic_mid_turn() {
    let server = spawn_server(ServerOptions {
        transcripts: &["PANIC", "tell me a joke"],
        ..ServerOptions::default()
    })
    .await;
    let root = server.scratch_root.path();
    let mut ws = connect(server.addr).await;

    send(&mut ws, audio_event(2048)).await;
    let events = turn_events(&mut ws).await;
    assert_eq!(kinds(&events), vec!["error"]);
    assert_eq!(events[0]["message"], "Internal server error");

    // The error reached the client, so the connection stays usable.
    send(&mut ws, audio_event(2048)).await;
    let events = turn_events(&mut ws).await;
    assert_eq!(kinds(&events), vec!["transcription", "response", "audio"]);
    wait_for_entries(root, 1).await;

    ws.close(None).await.unwrap();
    wait_for_entries(root, 0).await;
}

#[tokio::test]
async fn scratch_removed_when_client_leaves_during_a_failing_turn() {
    let server = spawn_server(ServerOptions {
        transcripts: &["SLOW_FAIL"],
        ..ServerOptions::default()
    })
    .await;
    let root = server.scratch_root.path();
    let mut ws = connect(server.addr).await;

    send(&mut ws, audio_event(2048)).await;
    wait_for_entries(root, 1).await;
    // Gone before the turn can report its failure.
    drop(ws);

    wait_until_transcribing(&server).await;
    wait_for_entries(root, 0).await;
}

async fn wait_until_transcribing(server: &TestServer) {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while server
        .transcriber
        .calls
        .load(std::sync::atomic::Ordering::SeqCst)
        == 0
    {
        assert!(tokio::time::Instant::now() < deadline, "turn never started");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn each_connection_gets_its_own_scratch_dir() {
    let server = spawn_server(ServerOptions::default()).await;
    let root = server.scratch_root.path();

    let mut first = connect(server.addr).await;
    let mut second = connect(server.addr).await;
    send(&mut first, audio_event(2048)).await;
    send(&mut second, audio_event(2048)).await;
    turn_events(&mut first).await;
    turn_events(&mut second).await;
    wait_for_entries(root, 2).await;

    first.close(None).await.unwrap();
    wait_for_entries(root, 1).await;
    second.close(None).await.unwrap();
    wait_for_entries(root, 0).await;
}
