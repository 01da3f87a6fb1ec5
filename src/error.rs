//! Error types for rendezvous channels.
//!
//! 会合通道的错误类型。

use thiserror::Error;

/// The way a caller broke the rendezvous protocol
///
/// 调用方违反会合协议的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
    /// A payload was sent on the starter exchange
    ///
    /// 在起始交换中发送了有效载荷
    #[error("payload sent on the starter exchange")]
    PayloadOnStarter,

    /// The counterpart answered the starter exchange with a payload
    ///
    /// 对端用有效载荷回应了起始交换
    #[error("starter exchange answered with a payload")]
    UnexpectedPayload,

    /// The same end started an exchange while another one was in flight
    ///
    /// 同一端在另一次交换进行时发起了新的交换
    #[error("exchange already in flight on this end")]
    ConcurrentExchange,
}

/// Error type for channel operations
///
/// `Closed` is the expected end of a conversation and is absorbed by scopes and
/// readers. The other variants are programming errors and always propagate.
///
/// Channel 操作的错误类型
///
/// `Closed` 是对话的预期结束，会被作用域和读取器吸收。其他变体是编程错误，总是向上传播。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The channel has been closed by either end
    ///
    /// 通道已被任一端关闭
    #[error("channel closed")]
    Closed,

    /// The rendezvous protocol was misused
    ///
    /// 会合协议被误用
    #[error("protocol violation: {0}")]
    ProtocolViolation(#[from] Violation),

    /// `open` was called on an end that already has an active scope
    ///
    /// 在已有活动作用域的端上调用了 `open`
    #[error("channel end already open")]
    AlreadyOpen,
}

impl ChannelError {
    /// Whether this is the ordinary end-of-stream condition
    ///
    /// 是否为正常的流结束情况
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, ChannelError::Closed)
    }
}
