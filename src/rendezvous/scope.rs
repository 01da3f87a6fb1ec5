//! Scoped open/close for one channel end.
//!
//! A [`Scope`] pairs starting an end with closing the channel on every exit
//! path: normal completion, an error, a panic, or cancellation of the task.
//!
//! 单个通道端的作用域式打开/关闭。
//!
//! [`Scope`] 将启动一端与关闭通道配对，覆盖所有退出路径：正常完成、错误、panic 或任务取消。

use std::fmt;
use std::future::Future;
use std::ops::Deref;

use log::{debug, trace};

use super::Channel;
use crate::error::ChannelError;
use crate::shim::atomic::Ordering;

/// Options for [`Channel::open`] and [`Channel::scoped`]
///
/// Defaults: `wait = true`, `propagate_closed = false`.
///
/// [`Channel::open`] 和 [`Channel::scoped`] 的选项
///
/// 默认值：`wait = true`，`propagate_closed = false`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    wait: bool,
    propagate_closed: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            wait: true,
            propagate_closed: false,
        }
    }
}

impl OpenOptions {
    /// Default options, same as [`OpenOptions::default`]
    ///
    /// 默认选项，与 [`OpenOptions::default`] 相同
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the counterpart's first exchange before returning
    ///
    /// The end opened with `wait(true)` sends the first real value. With
    /// `wait(false)` the caller performs the starter itself with
    /// [`Channel::recv`].
    ///
    /// 返回前等待对端的第一次交换
    ///
    /// 以 `wait(true)` 打开的一端发送第一个真实值。使用 `wait(false)` 时，
    /// 调用方需要自己通过 [`Channel::recv`] 执行起始交换。
    #[inline]
    pub fn wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    /// Surface [`ChannelError::Closed`] from the scope instead of absorbing it
    ///
    /// 从作用域中返回 [`ChannelError::Closed`] 而不是吸收它
    #[inline]
    pub fn propagate_closed(mut self, propagate: bool) -> Self {
        self.propagate_closed = propagate;
        self
    }

    fn settle<R>(&self, result: Result<R, ChannelError>) -> Result<Option<R>, ChannelError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_closed() && !self.propagate_closed => {
                trace!("channel closed inside scope, treating as end of stream");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

/// An opened channel end
///
/// Dereferences to the [`Channel`]. Dropping the scope closes the channel and
/// releases the end for another `open`.
///
/// 已打开的通道端
///
/// 解引用为 [`Channel`]。丢弃作用域会关闭通道，并释放该端以便再次 `open`。
pub struct Scope<'a, T> {
    channel: &'a Channel<T>,
    options: OpenOptions,
}

impl<T> fmt::Debug for Scope<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("channel", self.channel)
            .field("options", &self.options)
            .finish()
    }
}

impl<T> Deref for Scope<'_, T> {
    type Target = Channel<T>;

    #[inline]
    fn deref(&self) -> &Channel<T> {
        self.channel
    }
}

impl<T> Scope<'_, T> {
    /// Close the scope and apply the closure policy to `result`
    ///
    /// `Err(Closed)` becomes `Ok(None)` unless `propagate_closed` was set; any
    /// other error is returned unchanged.
    ///
    /// 关闭作用域并对 `result` 应用关闭策略
    ///
    /// 除非设置了 `propagate_closed`，否则 `Err(Closed)` 变为 `Ok(None)`；其他错误原样返回。
    pub fn finish<R>(self, result: Result<R, ChannelError>) -> Result<Option<R>, ChannelError> {
        self.options.settle(result)
    }
}

impl<T> Drop for Scope<'_, T> {
    fn drop(&mut self) {
        self.channel.close();
        self.channel.opened.store(false, Ordering::Release);
        trace!("channel scope exited");
    }
}

impl<T> Channel<T> {
    /// Open this end, returning a guard that closes the channel when dropped
    ///
    /// Fails with [`ChannelError::AlreadyOpen`] if this end already has an
    /// active scope; that check happens before any waiting.
    ///
    /// 打开这一端，返回一个在丢弃时关闭通道的守卫
    ///
    /// 如果这一端已有活动作用域，则返回 [`ChannelError::AlreadyOpen`]；该检查在任何等待之前进行。
    ///
    /// # Example
    ///
    /// ```
    /// use lite_rendezvous::{channel, ChannelError, OpenOptions};
    ///
    /// # tokio_test::block_on(async {
    /// let (left, _right) = channel::<u8>();
    ///
    /// let scope = left.open(OpenOptions::new().wait(false)).await.unwrap();
    /// let second = left.open(OpenOptions::new().wait(false)).await;
    /// assert_eq!(second.unwrap_err(), ChannelError::AlreadyOpen);
    ///
    /// drop(scope);
    /// assert!(left.is_closed());
    /// # });
    /// ```
    pub async fn open(&self, options: OpenOptions) -> Result<Scope<'_, T>, ChannelError> {
        if self.opened.swap(true, Ordering::AcqRel) {
            debug!("open called on an end that is already open");
            return Err(ChannelError::AlreadyOpen);
        }

        // Created first so that a failed or cancelled wait still closes
        let scope = Scope {
            channel: self,
            options,
        };

        if options.wait {
            self.wait().await?;
        }

        trace!("channel end opened");
        Ok(scope)
    }

    /// Run `body` inside a scope on this end
    ///
    /// Opens with `options`, runs the body with the channel and closes the
    /// channel afterwards, whatever the outcome. Returns `Ok(None)` when the
    /// conversation ended by closure (unless `propagate_closed` is set).
    ///
    /// 在这一端的作用域内运行 `body`
    ///
    /// 使用 `options` 打开，运行 body，之后无论结果如何都会关闭通道。
    /// 对话因关闭而结束时返回 `Ok(None)`（除非设置了 `propagate_closed`）。
    pub async fn scoped<'a, F, Fut, R>(
        &'a self,
        options: OpenOptions,
        body: F,
    ) -> Result<Option<R>, ChannelError>
    where
        F: FnOnce(&'a Channel<T>) -> Fut,
        Fut: Future<Output = Result<R, ChannelError>>,
    {
        let scope = match self.open(options).await {
            Ok(scope) => scope,
            Err(err) => return options.settle(Err(err)),
        };

        let result = body(self).await;
        scope.finish(result)
    }
}
