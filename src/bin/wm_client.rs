// Client entry point: a minimal BaseWindow driving a stub draw client
// through a few synthetic frames. The real UI toolkit and RPC stub are
// external collaborators per §1; this exists to exercise the client
// state machine end to end the way main.rs exercises the compositor.
use wm_core::client::{BaseWindow, DrawClient};
use wm_core::layout::{LayoutParams, Rect};
use wm_utils::log::info;

struct FillDrawClient {
    color: u8,
}

impl DrawClient for FillDrawClient {
    fn draw_frame(&mut self, buffer: &mut [u8], _width: u32, _height: u32) {
        for byte in buffer.iter_mut() {
            *byte = self.color;
        }
    }

    fn finish_drawing(&mut self) -> bool {
        true
    }

    fn rect_crop(&self) -> Option<Rect> {
        None
    }
}

fn main() {
    info!("window client starting");

    let layout_params = LayoutParams {
        token: 1,
        width: 64,
        height: 64,
        ..Default::default()
    };
    let mut window = BaseWindow::new(layout_params, FillDrawClient { color: 0x7F });

    window.handle_app_visibility(true);
    info!("window visible: {}, vsync request: {:?}", window.is_visible(), window.vsync_request());

    for seq in 0..3 {
        window.on_frame(seq);
    }
}
