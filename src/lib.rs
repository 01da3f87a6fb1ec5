//! # lite-rendezvous
//!
//! Lightweight async rendezvous channel for Rust.
//!
//! 轻量级的 Rust 异步会合通道。
//!
//! ## Overview / 概述
//!
//! A rendezvous channel connects exactly two tasks. A value sent by one end is
//! handed directly to the other end, and each side is suspended until its
//! counterpart arrives. There is no buffer beyond the single pending exchange,
//! so the two ends strictly alternate and backpressure is total.
//!
//! 会合通道恰好连接两个任务。一端发送的值直接交给另一端，每一方都会挂起直到对端到达。
//! 除了唯一的待决交换之外没有缓冲区，因此两端严格交替，背压是完全的。
//!
//! ## Key Features / 主要特性
//!
//! - **Eager hand-off**: `send` delivers its value before returning the future
//!   that awaits the reply
//! - **Explicit lifecycle**: `Created → Open → Closed`, with closure observed
//!   exactly once by the counterpart
//! - **Cancellation-safe**: dropping a waiting exchange, an end or a scope
//!   closes the channel instead of stranding the other side
//! - **Batched exchanges**: many items, even lazy or unbounded sequences, per
//!   scheduler round-trip
//!
//! - **立即交接**：`send` 在返回等待回复的 future 之前就交出其值
//! - **显式生命周期**：`Created → Open → Closed`，对端只会观察到一次关闭
//! - **取消安全**：丢弃等待中的交换、通道端或作用域都会关闭通道，而不是搁置另一方
//! - **批量交换**：每次调度往返可传递多个元素，甚至是惰性或无界序列
//!
//! ## Modules / 模块
//!
//! ### [`rendezvous`]
//!
//! The channel itself: [`Channel`], the [`Exchange`] future and scoped
//! open/close through [`OpenOptions`] and [`Scope`].
//!
//! 通道本身：[`Channel`]、[`Exchange`] future，以及通过 [`OpenOptions`] 和 [`Scope`] 进行的作用域式打开/关闭。
//!
//! ### [`batch`]
//!
//! [`batch::Writer`] and [`batch::Reader`] carry a whole sequence of items per
//! exchange.
//!
//! [`batch::Writer`] 和 [`batch::Reader`] 每次交换传递整段元素序列。
//!
//! ### [`slot`]
//!
//! Lock-free single-assignment cell used for every exchange.
//!
//! 每次交换所使用的无锁单次赋值单元。
//!
//! ## Examples / 示例
//!
//! ### Duplex conversation
//!
//! ```
//! use lite_rendezvous::{channel, ChannelError, OpenOptions};
//!
//! # tokio_test::block_on(async {
//! let (ping, pong) = channel::<String>();
//!
//! let responder = tokio::spawn(async move {
//!     pong.scoped(OpenOptions::new().wait(false), |ch| async move {
//!         let mut incoming = ch.recv().await?;
//!         while let Some(text) = incoming {
//!             incoming = ch.send(text.to_uppercase()).await?;
//!         }
//!         Ok::<(), ChannelError>(())
//!     })
//!     .await
//! });
//!
//! let scope = ping.open(OpenOptions::new()).await.unwrap();
//! assert_eq!(scope.send("hello".into()).await, Ok(Some("HELLO".to_string())));
//! drop(scope);
//!
//! assert_eq!(responder.await.unwrap(), Ok(None));
//! # });
//! ```
//!
//! ### Batched producer
//!
//! ```
//! use lite_rendezvous::batch;
//!
//! # tokio_test::block_on(async {
//! let (writer, mut reader) = batch::channel::<u64>();
//!
//! tokio::spawn(async move {
//!     // An unbounded sequence; the reader decides how much to take
//!     let _ = writer.send_many((1..).map(|n| n * n)).await;
//! });
//!
//! assert_eq!(reader.drain(Some(4)).await, Ok(vec![1, 4, 9, 16]));
//! # });
//! ```
//!
//! ## Safety / 安全性
//!
//! The slot uses `unsafe` internally but exposes a safe API. The value is
//! written once before the ready state is published and moved out once by the
//! side that wins the ready-to-taken transition. Building with the `loom`
//! feature model-checks that hand-off.
//!
//! 槽在内部使用 `unsafe`，但暴露安全的 API。值在发布就绪状态之前写入一次，
//! 并由赢得"就绪到已取走"转换的一方取出一次。启用 `loom` 特性构建可对该交接进行模型检查。

pub mod batch;
pub mod error;
pub mod rendezvous;
pub mod slot;

mod shim;

pub use error::{ChannelError, Violation};
pub use rendezvous::{channel, Channel, Exchange, OpenOptions, Scope, State};
