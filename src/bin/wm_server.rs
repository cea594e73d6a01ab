// Server entry point: drives the WindowService's registries and the
// vsync timer loop. Mirrors main.rs's "spin then run_forever" shape,
// replacing the Vulkan/Wayland run loop with the vsync tick this core
// models directly.
use wm_core::layout::{LayoutParams, Visibility, WindowType};
use wm_core::service_context::ServiceContext;
use wm_core::vsync::REFRESH_PERIOD_MS;
use wm_core::window::renderer::DummyRenderer;
use wm_utils::log::info;

const DISPLAY_WIDTH: i32 = 480;
const DISPLAY_HEIGHT: i32 = 480;

fn main() {
    info!("window manager server starting, display {}x{}", DISPLAY_WIDTH, DISPLAY_HEIGHT);

    let mut ctx = ServiceContext::new(DISPLAY_WIDTH, DISPLAY_HEIGHT, Box::new(DummyRenderer::new()));

    ctx.service.add_window_token(1, WindowType::Application, 0, std::process::id() as i32);

    let layout_params = LayoutParams {
        token: 1,
        ..Default::default()
    };
    match ctx.service.add_window(100, layout_params, Visibility::Visible) {
        Ok(_channel) => info!("registered client 100 against token 1"),
        Err(e) => info!("addWindow failed: {:?}", e),
    }

    ctx.service.request_vsync(100, wm_core::vsync::VsyncRequest::Periodic).ok();
    ctx.sync_vsync_timer();

    info!("entering vsync loop (period {}ms); exiting after 5 ticks", REFRESH_PERIOD_MS);
    for _ in 0..5 {
        let fired = ctx.on_vsync();
        info!("vsync: {} window(s) notified", fired.len());
        std::thread::sleep(std::time::Duration::from_millis(REFRESH_PERIOD_MS));
    }
}
