// End-to-end scenarios spanning WindowService, the buffer queue, and
// the transaction pipeline together, the way a single frame actually
// flows through the system end to end per §5's ordering guarantee.
use wm_core::input::message::{GestureBits, InputMessage, InputMessageState};
use wm_core::input::{InputDispatcher, MAX_MSG};
use wm_core::layout::{LayoutParams, Visibility, WindowType};
use wm_core::transaction::SurfaceTransaction;
use wm_core::vsync::VsyncRequest;
use wm_core::window::renderer::DummyRenderer;
use wm_core::window::WindowService;

fn bootstrap(service: &mut WindowService, renderer: &mut DummyRenderer, client: u64, token: u64) {
    service.add_window_token(token, WindowType::Application, 0, 1);
    let lp = LayoutParams { token, width: 8, height: 8, ..Default::default() };
    service.add_window(client, lp.clone(), Visibility::Visible).unwrap();
    service.relayout(client, lp, 8, 8, Visibility::Visible, renderer).unwrap();
}

#[test]
fn full_frame_cycle_draws_and_releases_prior_buffer() {
    let mut service = WindowService::new(480, 480);
    let mut renderer = DummyRenderer::new();
    bootstrap(&mut service, &mut renderer, 100, 1);

    let producer = service
        .relayout(
            100,
            LayoutParams { token: 1, width: 8, height: 8, ..Default::default() },
            8,
            8,
            Visibility::Visible,
            &mut renderer,
        )
        .unwrap()
        .producer;

    // First frame: dequeue, fill, queue, apply.
    let key_a = producer.dequeue().unwrap();
    producer.queue(key_a).unwrap();
    let mut txn = SurfaceTransaction::new();
    txn.set_buffer(100, key_a);
    let released = service.apply_transaction(txn.drain(), &mut renderer);
    assert!(released.is_empty(), "no prior buffer to release on the first frame");
    assert_eq!(renderer.draw_calls, 1);

    // Second frame: a new buffer displaces the first, which is released.
    let key_b = producer.dequeue().unwrap();
    producer.queue(key_b).unwrap();
    let mut txn = SurfaceTransaction::new();
    txn.set_buffer(100, key_b);
    let released = service.apply_transaction(txn.drain(), &mut renderer);
    assert_eq!(released, vec![(100, key_a)]);
    assert_eq!(renderer.draw_calls, 2);
}

#[test]
fn vsync_single_request_fires_once_then_stops() {
    let mut service = WindowService::new(480, 480);
    let mut renderer = DummyRenderer::new();
    bootstrap(&mut service, &mut renderer, 100, 1);

    service.request_vsync(100, VsyncRequest::Single).unwrap();
    assert!(service.any_subscribed());

    let fired = service.on_vsync();
    assert_eq!(fired, vec![100]);
    assert!(!service.any_subscribed());

    let fired_again = service.on_vsync();
    assert!(fired_again.is_empty());
}

#[test]
fn vsync_periodic_then_none_stops_delivery() {
    let mut service = WindowService::new(480, 480);
    let mut renderer = DummyRenderer::new();
    bootstrap(&mut service, &mut renderer, 100, 1);

    service.request_vsync(100, VsyncRequest::Periodic).unwrap();
    assert_eq!(service.on_vsync(), vec![100]);
    assert_eq!(service.on_vsync(), vec![100]);

    service.request_vsync(100, VsyncRequest::None).unwrap();
    assert!(service.on_vsync().is_empty());
}

#[test]
fn full_input_queue_drops_further_events_until_drained() {
    let dispatcher = InputDispatcher::create("slow-client");
    let msg = InputMessage::pointer(InputMessageState::Pressed, 0, 0, 0, 0, GestureBits::empty());

    for _ in 0..MAX_MSG {
        dispatcher.send_message(msg).unwrap();
    }
    assert!(dispatcher.send_message(msg).is_err());
    assert!(dispatcher.send_message(msg).is_err());

    let channel = dispatcher.channel();
    channel.receive();
    dispatcher.send_message(msg).unwrap();
}
