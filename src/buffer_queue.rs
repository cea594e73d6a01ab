// The buffer queue: a fixed-slot, dual-endpoint state machine over
// shared-memory pixel buffers.
//
// Grounded on common/BufferQueue.cpp's `toState`/`syncState` switch and on
// ways/shm.rs's ShmRegion for the mmap-backed storage. Unlike wl_shm
// (attach/commit, no intermediate ownership states) this tracks the full
// FREE/DEQUEUED/QUEUED/ACQUIRED cycle described in §4.1.
use std::collections::{HashMap, VecDeque};
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::cell::RefCell;

use nix::sys::memfd::{memfd_create, MemFdCreateFlag};
use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};
use nix::unistd::ftruncate;
use std::num::NonZeroUsize;
use std::ptr::NonNull;

use crate::error::{WmError, WmResult};
use crate::pixel::PixelFormat;

pub type BufferKey = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    Free,
    Dequeued,
    Queued,
    Acquired,
}

/// An anonymous shared-memory region backing one buffer slot.
///
/// Mirrors ways/shm.rs's ShmRegion: mmap'd on creation, munmap'd and
/// closed on Drop. The OS-level `memfd_create`/`ftruncate`/`mmap` trio
/// this wraps is explicitly out of scope per §1 (external OS primitives);
/// this struct is the thin, owned handle the core operates through.
#[derive(Debug)]
pub struct ShmRegion {
    fd: RawFd,
    ptr: NonNull<u8>,
    size: usize,
}

impl ShmRegion {
    pub fn new(size: usize, name: &str) -> WmResult<Self> {
        let cname = std::ffi::CString::new(name).map_err(|_| WmError::InvalidState)?;
        let fd = memfd_create(&cname, MemFdCreateFlag::empty()).map_err(|_| WmError::InvalidState)?;
        ftruncate(&fd, size as i64).map_err(|_| WmError::InvalidState)?;

        let len = NonZeroUsize::new(size).ok_or(WmError::InvalidState)?;
        let ptr = unsafe {
            mmap(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &fd,
                0,
            )
            .map_err(|_| WmError::InvalidState)?
        };

        Ok(Self {
            fd: std::os::unix::io::AsRawFd::as_raw_fd(&fd).pipe(|raw| {
                // Leak the owned Fd into a bare RawFd: we manage the
                // close ourselves in Drop, matching the source's manual
                // munmap+close pair rather than RAII Fd semantics.
                std::mem::forget(fd);
                raw
            }),
            ptr: ptr.cast(),
            size,
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.size) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size) }
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

trait Pipe: Sized {
    fn pipe<R>(self, f: impl FnOnce(Self) -> R) -> R {
        f(self)
    }
}
impl<T> Pipe for T {}

// SAFETY: the region is only ever touched by whichever side currently
// owns the buffer (DEQUEUED => producer, ACQUIRED => consumer); the core
// never aliases a mutable reference across that boundary.
unsafe impl Send for ShmRegion {}

impl Drop for ShmRegion {
    fn drop(&mut self) {
        let len = match NonZeroUsize::new(self.size) {
            Some(l) => l,
            None => return,
        };
        unsafe {
            let _ = munmap(self.ptr.cast(), len.get());
            let _ = nix::unistd::close(self.fd);
        }
    }
}

#[derive(Debug)]
pub struct BufferItem {
    pub key: BufferKey,
    pub region: ShmRegion,
    pub state: BufferState,
}

/// Surface: `{ token, handle, width, height, pixel_format, buffers,
/// free_slots, data_slots }` from §3 DATA MODEL.
pub struct Surface {
    pub token: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    buffers: HashMap<BufferKey, BufferItem>,
    free_slots: VecDeque<BufferKey>,
    data_slots: VecDeque<BufferKey>,
}

impl Surface {
    pub fn new(token: u64, width: u32, height: u32, format: PixelFormat, keys: &[BufferKey]) -> WmResult<Self> {
        let size = width as usize * height as usize * format.bytes_per_pixel();
        let mut buffers = HashMap::new();
        let mut free_slots = VecDeque::new();

        for &key in keys {
            let region = ShmRegion::new(size, &format!("wm-surf-{}-buf-{}", token, key))?;
            buffers.insert(
                key,
                BufferItem {
                    key,
                    region,
                    state: BufferState::Free,
                },
            );
            free_slots.push_back(key);
        }

        Ok(Self {
            token,
            width,
            height,
            format,
            buffers,
            free_slots,
            data_slots: VecDeque::new(),
        })
    }

    pub fn get(&self, key: BufferKey) -> Option<&BufferItem> {
        self.buffers.get(&key)
    }

    pub fn get_mut(&mut self, key: BufferKey) -> Option<&mut BufferItem> {
        self.buffers.get_mut(&key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.buffers
            .values()
            .filter(|b| !matches!(b.state, BufferState::Free))
            .count()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// The transition table from §4.1, mirroring BufferQueue::toState.
    fn to_state(&mut self, key: BufferKey, target: BufferState) -> WmResult<()> {
        let item = self.buffers.get_mut(&key).ok_or(WmError::InvalidState)?;

        let ok = match (item.state, target) {
            (BufferState::Free, BufferState::Dequeued) => {
                remove_one(&mut self.free_slots, key)
            }
            (BufferState::Free, BufferState::Queued) => {
                if remove_one(&mut self.free_slots, key) {
                    self.data_slots.push_back(key);
                    true
                } else {
                    false
                }
            }
            (BufferState::Dequeued, BufferState::Queued) => {
                self.data_slots.push_back(key);
                true
            }
            (BufferState::Dequeued, BufferState::Free) => {
                self.free_slots.push_back(key);
                true
            }
            (BufferState::Queued, BufferState::Acquired) => {
                remove_one(&mut self.data_slots, key)
            }
            (BufferState::Queued, BufferState::Free) => {
                remove_one(&mut self.data_slots, key)
            }
            (BufferState::Acquired, BufferState::Free) => {
                self.free_slots.push_back(key);
                true
            }
            _ => false,
        };

        if !ok {
            return Err(WmError::InvalidState);
        }
        self.buffers.get_mut(&key).unwrap().state = target;
        Ok(())
    }
}

fn remove_one(list: &mut VecDeque<BufferKey>, key: BufferKey) -> bool {
    if let Some(pos) = list.iter().position(|k| *k == key) {
        list.remove(pos);
        true
    } else {
        false
    }
}

/// Producer-side face of a BufferQueue: the client's view.
#[derive(Clone)]
pub struct BufferProducer {
    surface: Rc<RefCell<Surface>>,
}

impl BufferProducer {
    pub fn new(surface: Rc<RefCell<Surface>>) -> Self {
        Self { surface }
    }

    pub fn dequeue(&self) -> WmResult<BufferKey> {
        let mut s = self.surface.borrow_mut();
        let key = *s.free_slots.front().ok_or(WmError::NoBufferAvailable)?;
        s.to_state(key, BufferState::Dequeued)?;
        Ok(key)
    }

    pub fn queue(&self, key: BufferKey) -> WmResult<()> {
        self.surface.borrow_mut().to_state(key, BufferState::Queued)
    }

    /// Cancel a dequeued buffer that was never queued. Per §5, a client
    /// that draws but does not call `queue` must cancel to return the
    /// slot to FREE.
    pub fn cancel(&self, key: BufferKey) -> WmResult<()> {
        self.surface.borrow_mut().to_state(key, BufferState::Free)
    }

    /// `syncFree`: reconciles the producer's view after the consumer's
    /// `release` has moved the buffer QUEUED->FREE... actually the
    /// buffer is already FREE on the consumer side; this call brings the
    /// producer's local bookkeeping back in sync. Modeled here as a
    /// state check since both sides share one Surface in-process.
    pub fn sync_free(&self, key: BufferKey) -> WmResult<()> {
        let s = self.surface.borrow();
        match s.get(key).map(|b| b.state) {
            Some(BufferState::Free) => Ok(()),
            _ => Err(WmError::InvalidState),
        }
    }

    pub fn surface(&self) -> Rc<RefCell<Surface>> {
        self.surface.clone()
    }
}

/// Consumer-side face of a BufferQueue: the server's view.
#[derive(Clone)]
pub struct BufferConsumer {
    surface: Rc<RefCell<Surface>>,
}

impl BufferConsumer {
    pub fn new(surface: Rc<RefCell<Surface>>) -> Self {
        Self { surface }
    }

    /// `syncQueued`: the consumer observes a buffer the producer moved
    /// to QUEUED. FREE->QUEUED is only legal from the consumer's own
    /// reconciliation call, never `queue()` directly, hence keeping it
    /// separate from `acquire`.
    pub fn sync_queued(&self, key: BufferKey) -> WmResult<()> {
        let mut s = self.surface.borrow_mut();
        // the producer already performed FREE->QUEUED via `to_state`
        // when it called `queue()`; the consumer side simply needs the
        // buffer to be observably QUEUED before acquiring it.
        match s.get(key).map(|b| b.state) {
            Some(BufferState::Queued) => Ok(()),
            _ => {
                // cross-process reconciliation path: the consumer's
                // local view still says FREE, bring it to QUEUED.
                s.to_state(key, BufferState::Queued)
            }
        }
    }

    pub fn acquire(&self) -> WmResult<BufferKey> {
        let mut s = self.surface.borrow_mut();
        let key = *s.data_slots.front().ok_or(WmError::NoBufferAvailable)?;
        s.to_state(key, BufferState::Acquired)?;
        Ok(key)
    }

    pub fn release(&self, key: BufferKey) -> WmResult<()> {
        self.surface.borrow_mut().to_state(key, BufferState::Free)
    }

    pub fn surface(&self) -> Rc<RefCell<Surface>> {
        self.surface.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_surface(keys: &[BufferKey]) -> Rc<RefCell<Surface>> {
        Rc::new(RefCell::new(
            Surface::new(1, 4, 4, PixelFormat::Argb8888, keys).unwrap(),
        ))
    }

    #[test]
    fn ping_pong_round_trip_returns_to_initial_state() {
        let surface = make_surface(&[1, 2]);
        let producer = BufferProducer::new(surface.clone());
        let consumer = BufferConsumer::new(surface.clone());

        for key in [1, 2, 1, 2] {
            let dq = producer.dequeue().unwrap();
            assert_eq!(dq, key);
            producer.queue(dq).unwrap();
            consumer.sync_queued(dq).unwrap();
            let acq = consumer.acquire().unwrap();
            assert_eq!(acq, dq);
            consumer.release(acq).unwrap();
            producer.sync_free(acq).unwrap();
        }

        let s = surface.borrow();
        assert_eq!(s.get(1).unwrap().state, BufferState::Free);
        assert_eq!(s.get(2).unwrap().state, BufferState::Free);
    }

    #[test]
    fn dequeue_with_empty_free_list_fails() {
        let surface = make_surface(&[1]);
        let producer = BufferProducer::new(surface);
        producer.dequeue().unwrap();
        assert_eq!(producer.dequeue(), Err(WmError::NoBufferAvailable));
    }

    #[test]
    fn queue_without_dequeue_is_invalid_state() {
        let surface = make_surface(&[1]);
        let producer = BufferProducer::new(surface);
        assert_eq!(producer.queue(1), Err(WmError::InvalidState));
    }

    #[test]
    fn cancel_returns_dequeued_buffer_to_free() {
        let surface = make_surface(&[1]);
        let producer = BufferProducer::new(surface.clone());
        let key = producer.dequeue().unwrap();
        producer.cancel(key).unwrap();
        assert_eq!(surface.borrow().get(key).unwrap().state, BufferState::Free);
    }

    #[test]
    fn no_key_is_ever_in_both_slot_lists() {
        let surface = make_surface(&[1, 2, 3]);
        let producer = BufferProducer::new(surface.clone());
        let consumer = BufferConsumer::new(surface.clone());

        let a = producer.dequeue().unwrap();
        producer.queue(a).unwrap();
        consumer.sync_queued(a).unwrap();

        let s = surface.borrow();
        let free: std::collections::HashSet<_> = s.free_slots.iter().collect();
        let data: std::collections::HashSet<_> = s.data_slots.iter().collect();
        assert!(free.is_disjoint(&data));
    }

    #[test]
    fn in_flight_count_tracks_non_free_buffers() {
        let surface = make_surface(&[1, 2]);
        let producer = BufferProducer::new(surface.clone());
        assert_eq!(surface.borrow().in_flight_count(), 0);
        producer.dequeue().unwrap();
        assert_eq!(surface.borrow().in_flight_count(), 1);
    }
}
