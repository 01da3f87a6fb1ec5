//! Shared rendezvous state: the lifecycle enum and the single pending slot.
//!
//! 共享的会合状态：生命周期枚举与唯一的待决槽。

use std::mem;
use std::sync::PoisonError;

use log::trace;

use super::State;
use crate::error::{ChannelError, Violation};
use crate::shim::sync::{Mutex, MutexGuard};
use crate::slot::{self, Resolver, Slot};

/// Slot type used for every exchange; `None` is a payload-less exchange
pub(crate) type ExchangeSlot<T> = Slot<Option<T>>;

/// Lifecycle of a channel
///
/// `Open` owns the resolver of the one pending exchange, so a second pending
/// slot cannot exist.
enum Lifecycle<T> {
    Created,
    Open(Resolver<Option<T>>),
    Closed,
}

/// Core shared by both ends of a channel
pub(crate) struct Core<T> {
    lifecycle: Mutex<Lifecycle<T>>,
}

impl<T> Core<T> {
    pub(crate) fn new() -> Self {
        Self {
            lifecycle: Mutex::new(Lifecycle::Created),
        }
    }

    // The lifecycle is only replaced wholesale, never left half-updated.
    #[inline]
    fn lock(&self) -> MutexGuard<'_, Lifecycle<T>> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand `payload` to whoever awaits the pending slot and install a new one
    ///
    /// Resolving the old slot and installing the new one happen under a single
    /// lock acquisition. In `Created` this is the starter exchange and must not
    /// carry a payload.
    ///
    /// 将 `payload` 交给等待待决槽的一方，并安装新槽
    ///
    /// 解析旧槽与安装新槽在同一次加锁中完成。在 `Created` 状态下这是起始交换，不得携带有效载荷。
    pub(crate) fn exchange(&self, payload: Option<T>) -> Result<ExchangeSlot<T>, ChannelError> {
        let mut lifecycle = self.lock();

        let pending = match mem::replace(&mut *lifecycle, Lifecycle::Closed) {
            Lifecycle::Created if payload.is_some() => {
                *lifecycle = Lifecycle::Created;
                return Err(Violation::PayloadOnStarter.into());
            }
            Lifecycle::Created => None,
            Lifecycle::Open(pending) => Some(pending),
            Lifecycle::Closed => return Err(ChannelError::Closed),
        };

        let (resolver, next) = slot::channel();
        match pending {
            Some(pending) => pending.resolve(payload),
            None => trace!("rendezvous started by payload-less exchange"),
        }
        *lifecycle = Lifecycle::Open(resolver);

        Ok(next)
    }

    /// Perform the starter exchange if the channel is still `Created`
    ///
    /// Returns `None` when the channel is already open.
    pub(crate) fn start(&self) -> Result<Option<ExchangeSlot<T>>, ChannelError> {
        let mut lifecycle = self.lock();

        match *lifecycle {
            Lifecycle::Created => {
                let (resolver, starter) = slot::channel();
                *lifecycle = Lifecycle::Open(resolver);
                trace!("rendezvous started, waiting for counterpart");
                Ok(Some(starter))
            }
            Lifecycle::Open(_) => Ok(None),
            Lifecycle::Closed => Err(ChannelError::Closed),
        }
    }

    /// Move to `Closed`, resolving the pending slot with the closure signal
    ///
    /// Returns `false` if the channel was already closed.
    ///
    /// 转换到 `Closed`，并以关闭信号解析待决槽
    ///
    /// 如果通道已关闭则返回 `false`。
    pub(crate) fn close(&self) -> bool {
        let previous = mem::replace(&mut *self.lock(), Lifecycle::Closed);

        match previous {
            Lifecycle::Open(pending) => {
                pending.close();
                trace!("rendezvous closed with an exchange pending");
                true
            }
            Lifecycle::Created => {
                trace!("rendezvous closed before starting");
                true
            }
            Lifecycle::Closed => false,
        }
    }

    pub(crate) fn state(&self) -> State {
        match *self.lock() {
            Lifecycle::Created => State::Created,
            Lifecycle::Open(_) => State::Open,
            Lifecycle::Closed => State::Closed,
        }
    }
}
