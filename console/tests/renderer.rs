use forge_console::{Console, DisplayMode, EventRenderer, RenderState};
use forge_core::{EventHandler, SessionEvent};
use std::sync::Arc;

#[test]
fn test_concurrent_deltas_are_all_buffered() {
    const PRODUCERS: usize = 8;
    const DELTAS: usize = 250;

    let (console, capture) = Console::buffered();
    let state = Arc::new(RenderState::new());
    let renderer = Arc::new(EventRenderer::new(DisplayMode::Terse, Arc::new(console), state.clone()));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let renderer = renderer.clone();
            std::thread::spawn(move || {
                for _ in 0..DELTAS {
                    renderer.handle(&SessionEvent::delta("x"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    renderer.handle(&SessionEvent::AssistantMessage { content: None });
    assert_eq!(capture.stdout(), format!("\n{}\n\n", "x".repeat(PRODUCERS * DELTAS)));
    assert_eq!(state.take_message(), "");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_errors_keep_exactly_one() {
    let (console, capture) = Console::buffered();
    let state = Arc::new(RenderState::new());
    let renderer = Arc::new(EventRenderer::new(DisplayMode::Verbose, Arc::new(console), state.clone()));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let renderer = renderer.clone();
            tokio::spawn(async move { renderer.handle(&SessionEvent::error(format!("error {}", i))) })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    state.wait_done().await;
    let captured = state.error().unwrap();
    assert!(captured.starts_with("error "));
    // Every error is still shown
    assert_eq!(capture.stdout().matches("Session error:").count(), 16);
}

#[test]
fn test_handler_accepts_shared_renderer() {
    let (console, capture) = Console::buffered();
    let state = Arc::new(RenderState::new());
    let handler: Arc<dyn EventHandler> = Arc::new(EventRenderer::new(DisplayMode::Verbose, Arc::new(console), state));
    handler.handle(&SessionEvent::SessionStart);
    assert_eq!(capture.stdout(), "Session started\n");
}
