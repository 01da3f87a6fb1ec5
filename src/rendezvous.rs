//! Rendezvous channel between two tasks
//!
//! A value sent by one end is handed directly to the other end; each side is
//! suspended until the counterpart makes the matching call. There is no buffer:
//! exactly one exchange is pending at any time and the two ends strictly
//! alternate.
//!
//! 两个任务之间的会合通道
//!
//! 一端发送的值直接交给另一端；每一方都会挂起，直到对端发起匹配的调用。
//! 没有缓冲区：任何时刻只有一次交换处于待决状态，两端严格交替。
//!
//! # Protocol
//!
//! - The first exchange (the *starter*) carries no payload. The end that sends
//!   the first real value calls [`Channel::wait`] (or opens with
//!   `wait(true)`); the other end starts with [`Channel::recv`].
//! - [`Channel::send`] hands its value over immediately and returns an
//!   [`Exchange`] resolving to whatever the other end sends next.
//! - Closing either end, dropping it, or cancelling a waiting [`Exchange`]
//!   closes the channel. Every later exchange fails with
//!   [`ChannelError::Closed`].
//!
//! # Example
//!
//! ```
//! use lite_rendezvous::{channel, ChannelError, OpenOptions};
//!
//! # tokio_test::block_on(async {
//! let (left, right) = channel::<i32>();
//!
//! let doubler = tokio::spawn(async move {
//!     right
//!         .scoped(OpenOptions::new().wait(false), |ch| async move {
//!             let mut incoming = ch.recv().await?;
//!             while let Some(value) = incoming {
//!                 incoming = ch.send(value * 2).await?;
//!             }
//!             Ok::<(), ChannelError>(())
//!         })
//!         .await
//! });
//!
//! left.wait().await.unwrap();
//! assert_eq!(left.send(21).await, Ok(Some(42)));
//! left.close();
//! assert_eq!(doubler.await.unwrap(), Ok(None));
//! # });
//! ```

mod lifecycle;
mod scope;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures::stream::{self, Stream};
use log::{debug, trace};

use self::lifecycle::{Core, ExchangeSlot};
use crate::error::{ChannelError, Violation};
use crate::shim::atomic::{AtomicBool, Ordering};
use crate::shim::sync::Arc;
use crate::slot::SlotClosed;

pub use self::scope::{OpenOptions, Scope};

/// Observable lifecycle state of a channel
///
/// 通道可观察的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No exchange has happened yet
    ///
    /// 尚未发生任何交换
    Created,
    /// The starter exchange happened and one exchange is pending
    ///
    /// 起始交换已发生，且有一次交换待决
    Open,
    /// Either end closed the channel; terminal
    ///
    /// 任一端已关闭通道；终止状态
    Closed,
}

/// One end of a rendezvous channel
///
/// Both ends share the same core and are interchangeable; the channel does not
/// track which one is the sender. Each end allows a single exchange in flight
/// and a single active [`Scope`].
///
/// 会合通道的一端
///
/// 两端共享同一个核心并且可以互换；通道不记录哪一端是发送方。
/// 每一端同一时刻只允许一次进行中的交换和一个活动的 [`Scope`]。
pub struct Channel<T> {
    core: Arc<Core<T>>,
    busy: AtomicBool,
    opened: AtomicBool,
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("state", &self.state())
            .field("busy", &self.busy.load(Ordering::Acquire))
            .field("opened", &self.opened.load(Ordering::Acquire))
            .finish()
    }
}

/// Create a new rendezvous channel
///
/// Returns the two ends of the channel. Either end may send or receive.
///
/// 创建一个新的会合通道
///
/// 返回通道的两端，任一端都可以发送或接收。
pub fn channel<T>() -> (Channel<T>, Channel<T>) {
    let core = Arc::new(Core::new());
    (Channel::with_core(core.clone()), Channel::with_core(core))
}

impl<T> Channel<T> {
    fn with_core(core: Arc<Core<T>>) -> Self {
        Self {
            core,
            busy: AtomicBool::new(false),
            opened: AtomicBool::new(false),
        }
    }

    /// Send a value and wait for the counterpart's next exchange
    ///
    /// The hand-off happens when this method is called. Awaiting the returned
    /// [`Exchange`] yields `Some(value)` sent back by the other end, `None` if
    /// the other end exchanged without a payload, or [`ChannelError::Closed`].
    ///
    /// Fails with a protocol violation if the channel has not started yet.
    ///
    /// 发送一个值并等待对端的下一次交换
    ///
    /// 交接在调用此方法时发生。await 返回的 [`Exchange`] 得到对端回送的 `Some(value)`，
    /// 对端无载荷交换时得到 `None`，或者得到 [`ChannelError::Closed`]。
    pub fn send(&self, value: T) -> Exchange<'_, T> {
        self.begin(|core| core.exchange(Some(value)).map(Some))
    }

    /// Exchange without a payload and wait for the counterpart's next value
    ///
    /// On a fresh channel this is the starter exchange.
    ///
    /// 无载荷交换并等待对端的下一个值
    ///
    /// 在新通道上这就是起始交换。
    pub fn recv(&self) -> Exchange<'_, T> {
        self.begin(|core| core.exchange(None).map(Some))
    }

    /// Start the channel from the end that will send the first value
    ///
    /// On a `Created` channel this performs the starter exchange and waits until
    /// the counterpart makes its first, payload-less exchange. On an open
    /// channel it returns immediately.
    ///
    /// 从将要发送第一个值的一端启动通道
    ///
    /// 在 `Created` 通道上执行起始交换并等待对端第一次无载荷交换；通道已打开时立即返回。
    pub async fn wait(&self) -> Result<(), ChannelError> {
        match self.begin(|core| core.start()).await? {
            None => Ok(()),
            Some(_) => {
                debug!("starter exchange answered with a payload");
                Err(Violation::UnexpectedPayload.into())
            }
        }
    }

    /// Close the channel
    ///
    /// Whoever awaits the pending exchange observes [`ChannelError::Closed`].
    /// Closing twice is harmless.
    ///
    /// 关闭通道
    ///
    /// 等待待决交换的一方会观察到 [`ChannelError::Closed`]。重复关闭无害。
    #[inline]
    pub fn close(&self) {
        self.core.close();
    }

    /// Current lifecycle state
    ///
    /// 当前的生命周期状态
    #[inline]
    pub fn state(&self) -> State {
        self.core.state()
    }

    /// Whether either end has closed the channel
    ///
    /// 任一端是否已关闭通道
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state() == State::Closed
    }

    /// Stream of values received through repeated payload-less exchanges
    ///
    /// Ends when the channel closes. A protocol error is yielded once and ends
    /// the stream.
    ///
    /// 通过重复的无载荷交换接收到的值流
    ///
    /// 通道关闭时结束。协议错误只产出一次并结束该流。
    pub fn messages(&self) -> impl Stream<Item = Result<T, ChannelError>> + '_ {
        stream::unfold(Some(self), |channel| async move {
            let Some(channel) = channel else { return None };
            loop {
                match channel.recv().await {
                    Ok(Some(value)) => return Some((Ok(value), Some(channel))),
                    Ok(None) => continue,
                    Err(ChannelError::Closed) => return None,
                    Err(err) => return Some((Err(err), None)),
                }
            }
        })
    }

    fn begin<F>(&self, start: F) -> Exchange<'_, T>
    where
        F: FnOnce(&Core<T>) -> Result<Option<ExchangeSlot<T>>, ChannelError>,
    {
        if self.busy.swap(true, Ordering::AcqRel) {
            debug!("exchange started while another is in flight on the same end");
            return Exchange::finished(self, Err(Violation::ConcurrentExchange.into()));
        }

        match start(&self.core) {
            Ok(Some(slot)) => Exchange {
                channel: self,
                progress: Progress::Waiting(slot),
            },
            other => {
                self.busy.store(false, Ordering::Release);
                Exchange::finished(self, other.map(|_| None))
            }
        }
    }
}

impl<T> Drop for Channel<T> {
    fn drop(&mut self) {
        if self.core.close() {
            trace!("channel end dropped");
        }
    }
}

enum Progress<T> {
    /// Holds the busy flag of the owning end
    Waiting(ExchangeSlot<T>),
    Finished(Option<Result<Option<T>, ChannelError>>),
}

/// Future for one exchange, returned by [`Channel::send`] and [`Channel::recv`]
///
/// Dropping an `Exchange` that is still waiting is a cancellation: the channel
/// is closed so the counterpart is not left waiting forever.
///
/// 一次交换的 Future，由 [`Channel::send`] 和 [`Channel::recv`] 返回
///
/// 丢弃仍在等待的 `Exchange` 视为取消：通道会被关闭，对端不会永远等待。
#[must_use = "an exchange closes the channel when dropped before completion"]
pub struct Exchange<'a, T> {
    channel: &'a Channel<T>,
    progress: Progress<T>,
}

// Exchange never pins the payload
impl<T> Unpin for Exchange<'_, T> {}

impl<'a, T> Exchange<'a, T> {
    fn finished(channel: &'a Channel<T>, result: Result<Option<T>, ChannelError>) -> Self {
        Self {
            channel,
            progress: Progress::Finished(Some(result)),
        }
    }
}

impl<T> fmt::Debug for Exchange<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let waiting = matches!(self.progress, Progress::Waiting(_));
        f.debug_struct("Exchange")
            .field("waiting", &waiting)
            .finish_non_exhaustive()
    }
}

impl<T> Future for Exchange<'_, T> {
    type Output = Result<Option<T>, ChannelError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match &mut this.progress {
            Progress::Finished(result) => {
                Poll::Ready(result.take().unwrap_or(Err(ChannelError::Closed)))
            }
            Progress::Waiting(slot) => {
                let received = ready!(Pin::new(slot).poll(cx));
                this.progress = Progress::Finished(None);
                this.channel.busy.store(false, Ordering::Release);
                Poll::Ready(received.map_err(|SlotClosed| ChannelError::Closed))
            }
        }
    }
}

impl<T> Drop for Exchange<'_, T> {
    fn drop(&mut self) {
        if let Progress::Waiting(_) = self.progress {
            debug!("exchange cancelled while waiting, closing channel");
            self.channel.core.close();
            self.channel.busy.store(false, Ordering::Release);
        }
    }
}
