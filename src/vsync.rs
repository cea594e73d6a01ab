// Per-window vsync subscription and the frame timing record.
//
// Grounded on common/FrameMetaInfo.h's index-array timing record and on
// BaseWindow.cpp's vsync request advance (`nextVsyncState`); the
// scheduler's timer itself lives in ServiceContext since it is process-
// wide state, not per-window.
use wm_utils::log::get_current_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VsyncRequest {
    None,
    Single,
    Periodic,
}

impl VsyncRequest {
    /// `next(r)`: NONE->NONE, SINGLE->NONE, PERIODIC->PERIODIC.
    pub fn next(self) -> Self {
        match self {
            VsyncRequest::None => VsyncRequest::None,
            VsyncRequest::Single => VsyncRequest::None,
            VsyncRequest::Periodic => VsyncRequest::Periodic,
        }
    }

    pub fn is_subscribed(self) -> bool {
        !matches!(self, VsyncRequest::None)
    }
}

/// Platform constant: the nominal frame period the vsync timer fires at.
/// 60Hz, matching the displays this core targets.
pub const REFRESH_PERIOD_MS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMetaSkipReason {
    NoTarget,
    NoSurface,
    NothingToDraw,
    NoBuffer,
}

/// Per-vsync timing record, filled monotonically as a frame progresses
/// through the pipeline. Mirrors FrameMetaInfo's index-array design: each
/// mark* setter records `get_current_millis()` at the moment it's called,
/// and nothing here is ever read before it's written.
#[derive(Debug, Clone, Default)]
pub struct FrameMeta {
    pub vsync_id: u64,
    pub vsync_time: Option<u64>,
    pub frame_start: Option<u64>,
    pub layout_start: Option<u64>,
    pub render_start: Option<u64>,
    pub render_end: Option<u64>,
    pub sync_queued: Option<u64>,
    pub frame_finished: Option<u64>,
    pub frame_interval: Option<u64>,
    pub skip_reason: Option<FrameMetaSkipReason>,
}

impl FrameMeta {
    pub fn new(vsync_id: u64) -> Self {
        Self {
            vsync_id,
            ..Default::default()
        }
    }

    pub fn set_vsync(&mut self, prev_vsync_time: Option<u64>) {
        let now = get_current_millis();
        self.vsync_time = Some(now);
        self.frame_interval = prev_vsync_time.map(|prev| now.saturating_sub(prev));
    }

    pub fn mark_frame_start(&mut self) {
        self.frame_start = Some(get_current_millis());
    }

    pub fn mark_layout_start(&mut self) {
        self.layout_start = Some(get_current_millis());
    }

    pub fn mark_render_start(&mut self) {
        self.render_start = Some(get_current_millis());
    }

    pub fn mark_render_end(&mut self) {
        self.render_end = Some(get_current_millis());
    }

    pub fn mark_sync_queued(&mut self) {
        self.sync_queued = Some(get_current_millis());
    }

    pub fn mark_frame_finished(&mut self) {
        self.frame_finished = Some(get_current_millis());
    }

    pub fn skip(&mut self, reason: FrameMetaSkipReason) {
        self.skip_reason = Some(reason);
        self.frame_finished = Some(get_current_millis());
    }

    fn duration(start: Option<u64>, end: Option<u64>) -> Option<u64> {
        match (start, end) {
            (Some(s), Some(e)) => Some(e.saturating_sub(s)),
            _ => None,
        }
    }

    pub fn total_layout_duration(&self) -> Option<u64> {
        Self::duration(self.layout_start, self.render_start)
    }

    pub fn total_render_duration(&self) -> Option<u64> {
        Self::duration(self.render_start, self.render_end)
    }

    pub fn total_frame_duration(&self) -> Option<u64> {
        Self::duration(self.frame_start, self.frame_finished)
    }

    pub fn was_skipped(&self) -> bool {
        self.skip_reason.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_transitions_match_spec_table() {
        assert_eq!(VsyncRequest::None.next(), VsyncRequest::None);
        assert_eq!(VsyncRequest::Single.next(), VsyncRequest::None);
        assert_eq!(VsyncRequest::Periodic.next(), VsyncRequest::Periodic);
    }

    #[test]
    fn single_request_delivers_exactly_one_frame() {
        let mut r = VsyncRequest::Single;
        assert!(r.is_subscribed());
        r = r.next();
        assert!(!r.is_subscribed());
    }

    #[test]
    fn periodic_then_none_stops_delivery() {
        let mut r = VsyncRequest::Periodic;
        r = r.next();
        assert!(r.is_subscribed());
        r = VsyncRequest::None;
        assert!(!r.is_subscribed());
    }

    #[test]
    fn skip_sets_reason_and_finish_time() {
        let mut m = FrameMeta::new(1);
        m.skip(FrameMetaSkipReason::NoBuffer);
        assert!(m.was_skipped());
        assert!(m.frame_finished.is_some());
    }
}
