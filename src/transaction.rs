// Transaction accumulator: client-side batching of per-token layer
// mutations, applied atomically by the server.
//
// Grounded on app/SurfaceTransaction.h's `map<token, LayerState>`
// accumulator shape. The setBufferCrop/setPosition/setAlpha/apply bodies
// are left as `// TODO:` stubs in the source this is grounded on, so the
// merge and apply semantics here are authored directly from §4.2/§4.5.1
// rather than ported.
use std::collections::HashMap;

use crate::buffer_queue::BufferKey;
use crate::layout::Rect;

bitflags::bitflags! {
    pub struct LayerFlags: u8 {
        const POSITION_CHANGED    = 0x01;
        const ALPHA_CHANGED       = 0x02;
        const BUFFER_CHANGED      = 0x04;
        const BUFFER_CROP_CHANGED = 0x08;
    }
}

/// One token's accumulated mutations. Fields are only meaningful when
/// their corresponding flag is set; `flags` is the authoritative record
/// of which optionals are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerState {
    pub token: u64,
    pub flags: u8,
    pub buffer_key: Option<BufferKey>,
    pub buffer_crop: Option<Rect>,
    pub position: Option<(i32, i32)>,
    pub alpha: Option<f32>,
}

impl LayerState {
    pub fn new(token: u64) -> Self {
        Self {
            token,
            ..Default::default()
        }
    }

    /// Last-writer-wins merge of `other` into `self`; flags OR together.
    pub fn merge(&mut self, other: &LayerState) {
        self.flags |= other.flags;
        if other.buffer_key.is_some() {
            self.buffer_key = other.buffer_key;
        }
        if other.buffer_crop.is_some() {
            self.buffer_crop = other.buffer_crop;
        }
        if other.position.is_some() {
            self.position = other.position;
        }
        if other.alpha.is_some() {
            self.alpha = other.alpha;
        }
    }

    pub fn has(&self, flag: LayerFlags) -> bool {
        LayerFlags::from_bits_truncate(self.flags).contains(flag)
    }
}

/// Client-side accumulator keyed by token. Setters chain; `apply()`
/// hands the accumulated set to the transport and clears local state, so
/// a transaction object is reusable across frames.
#[derive(Debug, Default)]
pub struct SurfaceTransaction {
    entries: HashMap<u64, LayerState>,
}

impl SurfaceTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, token: u64) -> &mut LayerState {
        self.entries.entry(token).or_insert_with(|| LayerState::new(token))
    }

    pub fn set_buffer(&mut self, token: u64, key: BufferKey) -> &mut Self {
        let e = self.entry(token);
        e.buffer_key = Some(key);
        e.flags |= LayerFlags::BUFFER_CHANGED.bits();
        self
    }

    pub fn set_buffer_crop(&mut self, token: u64, crop: Rect) -> &mut Self {
        let e = self.entry(token);
        e.buffer_crop = Some(crop);
        e.flags |= LayerFlags::BUFFER_CROP_CHANGED.bits();
        self
    }

    pub fn set_position(&mut self, token: u64, x: i32, y: i32) -> &mut Self {
        let e = self.entry(token);
        e.position = Some((x, y));
        e.flags |= LayerFlags::POSITION_CHANGED.bits();
        self
    }

    pub fn set_alpha(&mut self, token: u64, alpha: f32) -> &mut Self {
        let e = self.entry(token);
        e.alpha = Some(alpha);
        e.flags |= LayerFlags::ALPHA_CHANGED.bits();
        self
    }

    /// Drains the accumulated entries for IPC send, in token order so
    /// wire output is deterministic. Clears local state.
    pub fn drain(&mut self) -> Vec<LayerState> {
        let mut out: Vec<LayerState> = self.entries.drain().map(|(_, v)| v).collect();
        out.sort_by_key(|e| e.token);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_set_buffer_is_indistinguishable_from_single_last_write() {
        let mut a = SurfaceTransaction::new();
        a.set_buffer(1, 10);
        a.set_buffer(1, 20);

        let mut b = SurfaceTransaction::new();
        b.set_buffer(1, 20);

        assert_eq!(a.drain(), b.drain());
    }

    #[test]
    fn flags_or_together_across_setters() {
        let mut t = SurfaceTransaction::new();
        t.set_buffer(1, 10);
        t.set_position(1, 5, 5);
        let entries = t.drain();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].has(LayerFlags::BUFFER_CHANGED));
        assert!(entries[0].has(LayerFlags::POSITION_CHANGED));
    }

    #[test]
    fn entries_for_distinct_tokens_are_independent() {
        let mut t = SurfaceTransaction::new();
        t.set_buffer(1, 10);
        t.set_buffer(2, 20);
        let entries = t.drain();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn drain_clears_local_state() {
        let mut t = SurfaceTransaction::new();
        t.set_buffer(1, 10);
        t.drain();
        assert!(t.is_empty());
    }
}
