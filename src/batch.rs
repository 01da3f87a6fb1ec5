//! Batched reading and writing over a rendezvous channel
//!
//! One exchange carries a whole sequence of items instead of exactly one, so a
//! producer can hand over many items for a single scheduler round-trip. The
//! sequence may be lazy or unbounded; the reader decides how much of it to pull.
//!
//! 基于会合通道的批量读写
//!
//! 一次交换携带整段元素序列而不是单个元素，生产者只需一次调度往返即可交出多个元素。
//! 序列可以是惰性的或无界的；由读取方决定拉取多少。
//!
//! # Example
//!
//! ```
//! use lite_rendezvous::batch;
//!
//! # tokio_test::block_on(async {
//! let (writer, mut reader) = batch::channel::<u32>();
//!
//! tokio::spawn(async move {
//!     writer.send_many(0..3).await.unwrap();
//!     writer.send_one(3).await.unwrap();
//!     writer.close();
//! });
//!
//! assert_eq!(reader.drain(None).await, Ok(vec![0, 1, 2, 3]));
//! # });
//! ```

use std::fmt;
use std::iter::{self, FusedIterator};

use futures::stream::{self, Stream};
use log::trace;

use crate::error::ChannelError;
use crate::rendezvous::{self, Channel};

/// Payload of one batched exchange
///
/// 一次批量交换的有效载荷
pub type Batch<T> = Box<dyn Iterator<Item = T> + Send>;

/// Create a batched channel
///
/// 创建一个批量通道
pub fn channel<T>() -> (Writer<T>, Reader<T>) {
    let (writer, reader) = rendezvous::channel();
    (Writer::new(writer), Reader::new(reader))
}

/// Writing end of a batched channel
///
/// 批量通道的写入端
pub struct Writer<T> {
    channel: Channel<Batch<T>>,
}

impl<T> fmt::Debug for Writer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Writer")
            .field("channel", &self.channel)
            .finish()
    }
}

impl<T> Writer<T> {
    /// Wrap an existing channel end
    ///
    /// 包装一个已有的通道端
    pub fn new(channel: Channel<Batch<T>>) -> Self {
        Self { channel }
    }

    /// Underlying channel end
    ///
    /// 底层的通道端
    #[inline]
    pub fn channel(&self) -> &Channel<Batch<T>> {
        &self.channel
    }

    /// Close the channel; the reader sees the end of the stream
    ///
    /// 关闭通道；读取方会看到流的结束
    #[inline]
    pub fn close(&self) {
        self.channel.close();
    }
}

impl<T: Send + 'static> Writer<T> {
    /// Send a single item as one exchange
    ///
    /// 以一次交换发送单个元素
    pub async fn send_one(&self, item: T) -> Result<(), ChannelError> {
        self.send_batch(Box::new(iter::once(item))).await
    }

    /// Send a whole sequence as one exchange
    ///
    /// Returns once the reader has requested its next exchange, i.e. after it
    /// finished with this batch.
    ///
    /// 以一次交换发送整个序列
    ///
    /// 在读取方请求下一次交换后返回，即读取方已处理完这一批。
    pub async fn send_many<I>(&self, items: I) -> Result<(), ChannelError>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        self.send_batch(Box::new(items.into_iter())).await
    }

    async fn send_batch(&self, batch: Batch<T>) -> Result<(), ChannelError> {
        // No-op once the channel is open
        self.channel.wait().await?;
        self.channel.send(batch).await?;
        Ok(())
    }
}

/// Batch currently being read
///
/// `Exhausted` is the explicit marker that no item of the last exchange is
/// left; only then may the reader request a new exchange. A `Draining` batch
/// may turn out empty on its next read.
enum Current<T> {
    Exhausted,
    Draining(Batch<T>),
}

/// Reading end of a batched channel
///
/// 批量通道的读取端
pub struct Reader<T> {
    channel: Channel<Batch<T>>,
    current: Current<T>,
}

impl<T> fmt::Debug for Reader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("channel", &self.channel)
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}

impl<T> Reader<T> {
    /// Wrap an existing channel end
    ///
    /// 包装一个已有的通道端
    pub fn new(channel: Channel<Batch<T>>) -> Self {
        Self {
            channel,
            current: Current::Exhausted,
        }
    }

    /// Underlying channel end
    ///
    /// 底层的通道端
    #[inline]
    pub fn channel(&self) -> &Channel<Batch<T>> {
        &self.channel
    }

    /// Close the channel; a pending writer observes [`ChannelError::Closed`]
    ///
    /// 关闭通道；等待中的写入方会观察到 [`ChannelError::Closed`]
    #[inline]
    pub fn close(&self) {
        self.channel.close();
    }

    /// Await the next exchange and return a cursor over its items
    ///
    /// Any unfinished batch, including items left over by
    /// [`drain`](Self::drain) or [`next_item`](Self::next_item), is discarded
    /// first. Returns [`ChannelError::Closed`] once the writer is gone.
    ///
    /// 等待下一次交换并返回其元素的游标
    ///
    /// 先丢弃任何未读完的批次，包括 [`drain`](Self::drain) 或 [`next_item`](Self::next_item) 留下的元素。
    /// 写入端消失后返回 [`ChannelError::Closed`]。
    pub async fn fetch_one(&mut self) -> Result<Cursor<'_, T>, ChannelError> {
        self.discard();
        if !self.pull().await? {
            return Err(ChannelError::Closed);
        }
        Ok(Cursor { reader: self })
    }

    /// Collect items across exchanges
    ///
    /// - `None`: until the channel closes.
    /// - `Some(n)`: until `n` items were collected or the channel closes,
    ///   whichever comes first. Closure yields the partial prefix, not an error.
    /// - `Some(0)`: an empty vector, without any exchange.
    ///
    /// 跨交换收集元素
    ///
    /// - `None`：直到通道关闭。
    /// - `Some(n)`：直到收集到 `n` 个元素或通道关闭，以先发生者为准。关闭时返回已收集的部分前缀，而不是错误。
    /// - `Some(0)`：返回空向量，不进行任何交换。
    pub async fn drain(&mut self, limit: Option<usize>) -> Result<Vec<T>, ChannelError> {
        let mut items = Vec::new();

        loop {
            let missing = match limit {
                Some(n) => n - items.len(),
                None => usize::MAX,
            };
            if missing == 0 {
                return Ok(items);
            }

            let resumed = match &mut self.current {
                Current::Draining(batch) => {
                    let before = items.len();
                    items.extend(batch.by_ref().take(missing));
                    items.len() - before
                }
                Current::Exhausted => 0,
            };
            // Limit reached; the rest of the batch stays for the next read
            if resumed == missing {
                continue;
            }

            self.discard();
            if !self.pull().await? {
                trace!("drain ended by closure after {} items", items.len());
                return Ok(items);
            }
        }
    }

    /// Next item across batch boundaries, `None` once the channel closes
    ///
    /// 跨批次边界读取下一个元素，通道关闭后返回 `None`
    pub async fn next_item(&mut self) -> Result<Option<T>, ChannelError> {
        loop {
            if let Some(item) = self.take_next() {
                return Ok(Some(item));
            }
            if !self.pull().await? {
                return Ok(None);
            }
        }
    }

    /// Turn the reader into a stream of items ending at closure
    ///
    /// 将读取端转换为在关闭时结束的元素流
    pub fn into_stream(self) -> impl Stream<Item = Result<T, ChannelError>> {
        stream::unfold(Some(self), |reader| async move {
            let Some(mut reader) = reader else {
                return None;
            };
            match reader.next_item().await {
                Ok(Some(item)) => Some((Ok(item), Some(reader))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }

    #[inline]
    fn is_exhausted(&self) -> bool {
        matches!(self.current, Current::Exhausted)
    }

    fn discard(&mut self) {
        self.current = Current::Exhausted;
    }

    fn take_next(&mut self) -> Option<T> {
        let Current::Draining(batch) = &mut self.current else {
            return None;
        };
        let item = batch.next();
        if item.is_none() {
            self.discard();
        }
        item
    }

    /// Request the next exchange; `false` when the channel closed
    async fn pull(&mut self) -> Result<bool, ChannelError> {
        debug_assert!(self.is_exhausted());

        match self.channel.recv().await {
            Ok(Some(batch)) => {
                self.current = Current::Draining(batch);
                Ok(true)
            }
            // The writer exchanged without a payload: an empty batch
            Ok(None) => Ok(true),
            Err(err) if err.is_closed() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Single-use view over the items of one exchange
///
/// Borrows the reader, so it cannot outlive the next fetch. Dropping it before
/// the end discards the remaining items of its batch.
///
/// 一次交换中元素的一次性视图
///
/// 借用读取端，因此不能存活到下一次获取之后。在末尾之前丢弃会丢弃该批次的剩余元素。
pub struct Cursor<'a, T> {
    reader: &'a mut Reader<T>,
}

impl<T> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("exhausted", &self.reader.is_exhausted())
            .finish()
    }
}

impl<T> Iterator for Cursor<'_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.reader.take_next()
    }
}

impl<T> FusedIterator for Cursor<'_, T> {}

impl<T> Drop for Cursor<'_, T> {
    fn drop(&mut self) {
        self.reader.discard();
    }
}
