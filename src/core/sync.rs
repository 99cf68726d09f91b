//! Bounded-wait synchronization primitives.
//!
//! Everything here is built on Embassy's critical-section blocking mutex, so
//! the non-async operations (`release`, `try_acquire`) are safe to call from
//! interrupt handlers and radio-stack callbacks, while the async operations
//! suspend the calling task until a unit arrives or the timeout elapses.
//! Nothing busy-spins.

use core::cell::RefCell;
use core::future::{poll_fn, Future};
use core::task::Poll;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use embassy_sync::waitqueue::WakerRegistration;
use embassy_time::Duration;

/// How long an operation may suspend the calling task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timeout {
    /// Do not wait: complete now or give up.
    Immediate,
    /// Wait at most this long.
    After(Duration),
    /// Wait until the external signal arrives.
    Forever,
}

impl Timeout {
    /// Build a timeout from milliseconds, where 0 means [`Timeout::Immediate`].
    pub const fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Timeout::Immediate
        } else {
            Timeout::After(Duration::from_millis(ms))
        }
    }

    /// `true` for [`Timeout::Immediate`]
    pub const fn is_immediate(&self) -> bool {
        matches!(self, Timeout::Immediate)
    }
}

/// Drive `fut` for at most `timeout`.
///
/// Returns `None` if the future did not complete in time. With
/// [`Timeout::Immediate`] the future is polled exactly once.
pub async fn wait_bounded<F: Future>(timeout: Timeout, fut: F) -> Option<F::Output> {
    match timeout {
        Timeout::Immediate => {
            let mut fut = core::pin::pin!(fut);
            poll_fn(|cx| match fut.as_mut().poll(cx) {
                Poll::Ready(value) => Poll::Ready(Some(value)),
                Poll::Pending => Poll::Ready(None),
            })
            .await
        }
        Timeout::After(duration) => embassy_time::with_timeout(duration, fut).await.ok(),
        Timeout::Forever => Some(fut.await),
    }
}

struct SemaphoreState {
    count: usize,
    waker: WakerRegistration,
}

/// Counting semaphore with a fixed upper bound.
///
/// `release` past `MAX` is a no-op, so producers in interrupt context can
/// never queue more than `MAX` pending units.
pub struct CountingSemaphore<const MAX: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<SemaphoreState>>,
}

impl<const MAX: usize> CountingSemaphore<MAX> {
    /// Create a semaphore holding `initial` units (clamped to `MAX`).
    pub const fn new(initial: usize) -> Self {
        let count = if initial > MAX { MAX } else { initial };
        Self {
            inner: Mutex::new(RefCell::new(SemaphoreState {
                count,
                waker: WakerRegistration::new(),
            })),
        }
    }

    /// Maximum number of units the semaphore can hold
    pub const fn capacity(&self) -> usize {
        MAX
    }

    /// Units currently available
    pub fn available(&self) -> usize {
        self.inner.lock(|cell| cell.borrow().count)
    }

    /// Give back one unit. Never blocks; callable from interrupt context.
    ///
    /// Returns `false` (and changes nothing) if the semaphore is full.
    pub fn release(&self) -> bool {
        self.inner.lock(|cell| {
            let mut state = cell.borrow_mut();
            if state.count >= MAX {
                return false;
            }
            state.count += 1;
            state.waker.wake();
            true
        })
    }

    /// Take one unit if one is available.
    pub fn try_acquire(&self) -> bool {
        self.inner.lock(|cell| {
            let mut state = cell.borrow_mut();
            if state.count == 0 {
                return false;
            }
            state.count -= 1;
            true
        })
    }

    /// Wait until a unit is available and take it.
    pub fn acquire(&self) -> impl Future<Output = ()> + '_ {
        poll_fn(move |cx| {
            self.inner.lock(|cell| {
                let mut state = cell.borrow_mut();
                if state.count > 0 {
                    state.count -= 1;
                    Poll::Ready(())
                } else {
                    state.waker.register(cx.waker());
                    Poll::Pending
                }
            })
        })
    }

    /// Wait up to `timeout` for a unit. Returns `true` if one was taken.
    pub async fn acquire_within(&self, timeout: Timeout) -> bool {
        if timeout.is_immediate() {
            return self.try_acquire();
        }
        wait_bounded(timeout, self.acquire()).await.is_some()
    }
}
