//! Single-assignment exchange cell.
//!
//! A slot is created empty and resolved exactly once, either with a value or
//! with the closure signal. The rendezvous core allocates a fresh slot for every
//! exchange; nothing is ever reused.
//!
//! 单次赋值的交换单元。
//!
//! 槽创建时为空，只会被解析一次：要么携带值，要么携带关闭信号。
//! 会合核心为每次交换分配一个新槽，从不复用。

use crate::shim::atomic::{AtomicU8, Ordering};
use crate::shim::cell::UnsafeCell;
use crate::shim::sync::Arc;
use crate::shim::task::AtomicWaker;
use std::fmt;
use std::future::Future;
use std::mem::MaybeUninit;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;

// States for the value cell
const EMPTY: u8 = 0; // Not resolved yet
const READY: u8 = 1; // Value stored, not taken
const CLOSED: u8 = 2; // Resolved with the closure signal
const TAKEN: u8 = 3; // Value moved out by the slot

/// The slot was resolved with the closure signal instead of a value
///
/// 槽以关闭信号而非值被解析
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("slot closed")]
pub struct SlotClosed;

enum TakeResult<T> {
    Ready(T),
    Pending,
    Closed,
}

struct Cell<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
    waker: AtomicWaker,
}

// SAFETY: the value is written once by the resolver before READY is published
// and read once by the slot after winning the READY -> TAKEN transition.
unsafe impl<T: Send> Send for Cell<T> {}
unsafe impl<T: Send> Sync for Cell<T> {}

impl<T> Cell<T> {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
            waker: AtomicWaker::new(),
        }
    }

    fn store(&self, value: T) {
        // SAFETY: only the unique resolver writes, and only while EMPTY
        self.value.with_mut(|v| unsafe { (*v).write(value) });
        self.state.store(READY, Ordering::Release);
        self.waker.wake();
    }

    fn close(&self) {
        self.state.store(CLOSED, Ordering::Release);
        self.waker.wake();
    }

    fn try_take(&self) -> TakeResult<T> {
        match self.state.load(Ordering::Acquire) {
            EMPTY => TakeResult::Pending,
            READY => {
                if self
                    .state
                    .compare_exchange(READY, TAKEN, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    return TakeResult::Closed;
                }
                // SAFETY: state was READY, value is initialized and now owned by us
                self.value
                    .with(|v| unsafe { TakeResult::Ready((*v).assume_init_read()) })
            }
            _ => TakeResult::Closed,
        }
    }
}

impl<T> Drop for Cell<T> {
    fn drop(&mut self) {
        // A value resolved into a slot nobody awaited anymore
        if self.state.load(Ordering::Acquire) == READY {
            self.value.with_mut(|v| unsafe { (*v).assume_init_drop() });
        }
    }
}

/// Resolving half of a slot
///
/// Dropping an unresolved `Resolver` resolves the slot with the closure signal,
/// so a waiter is never stranded.
///
/// 槽的解析端
///
/// 丢弃未解析的 `Resolver` 会以关闭信号解析该槽，因此等待者永远不会被搁置。
pub struct Resolver<T> {
    cell: Option<Arc<Cell<T>>>,
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

impl<T> Resolver<T> {
    /// Resolve the slot with a value and wake the waiter
    ///
    /// 用值解析槽并唤醒等待者
    #[inline]
    pub fn resolve(mut self, value: T) {
        if let Some(cell) = self.cell.take() {
            cell.store(value);
        }
    }

    /// Resolve the slot with the closure signal
    ///
    /// 用关闭信号解析槽
    #[inline]
    pub fn close(self) {
        drop(self);
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        if let Some(cell) = self.cell.take() {
            cell.close();
        }
    }
}

/// Awaiting half of a slot
///
/// Implements `Future` directly; resolves to the value or `SlotClosed`.
///
/// 槽的等待端
///
/// 直接实现了 `Future`，结果为值或 `SlotClosed`。
pub struct Slot<T> {
    cell: Arc<Cell<T>>,
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").finish_non_exhaustive()
    }
}

impl<T> Unpin for Slot<T> {}

impl<T> Future for Slot<T> {
    type Output = Result<T, SlotClosed>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let cell = &self.get_mut().cell;

        // Fast path
        match cell.try_take() {
            TakeResult::Ready(value) => return Poll::Ready(Ok(value)),
            TakeResult::Closed => return Poll::Ready(Err(SlotClosed)),
            TakeResult::Pending => {}
        }

        cell.waker.register(cx.waker());

        // Check again after registering the waker
        match cell.try_take() {
            TakeResult::Ready(value) => Poll::Ready(Ok(value)),
            TakeResult::Closed => Poll::Ready(Err(SlotClosed)),
            TakeResult::Pending => Poll::Pending,
        }
    }
}

/// Create an empty slot
///
/// 创建一个空槽
#[inline]
pub fn channel<T>() -> (Resolver<T>, Slot<T>) {
    let cell = Arc::new(Cell::new());
    (
        Resolver {
            cell: Some(cell.clone()),
        },
        Slot { cell },
    )
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::{sleep, Duration};

    #[tokio::test]
    async fn test_resolve_after_delay() {
        let (resolver, slot) = channel::<String>();

        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            resolver.resolve("Hello".to_string());
        });

        assert_eq!(slot.await, Ok("Hello".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_before_await() {
        let (resolver, slot) = channel::<Vec<u8>>();

        resolver.resolve(vec![1, 2, 3]);

        assert_eq!(slot.await, Ok(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_close_signal() {
        let (resolver, slot) = channel::<i32>();

        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            resolver.close();
        });

        assert_eq!(slot.await, Err(SlotClosed));
    }

    #[tokio::test]
    async fn test_resolver_dropped() {
        let (resolver, slot) = channel::<i32>();
        drop(resolver);
        assert_eq!(slot.await, Err(SlotClosed));
    }

    #[tokio::test]
    async fn test_await_mut_reference() {
        let (resolver, mut slot) = channel::<i32>();

        tokio::spawn(async move {
            resolver.resolve(7);
        });

        assert_eq!((&mut slot).await, Ok(7));
        // Resolved exactly once
        assert_eq!((&mut slot).await, Err(SlotClosed));
    }

    #[test]
    fn test_unclaimed_value_is_dropped() {
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct DropCounter;

        impl Drop for DropCounter {
            fn drop(&mut self) {
                DROPS.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let (resolver, slot) = channel::<DropCounter>();
        resolver.resolve(DropCounter);
        drop(slot);

        assert_eq!(DROPS.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_large_value() {
        let (resolver, slot) = channel::<Vec<u8>>();

        tokio::spawn(async move {
            resolver.resolve(vec![0u8; 1024 * 1024]);
        });

        assert_eq!(slot.await.map(|v| v.len()), Ok(1024 * 1024));
    }
}
