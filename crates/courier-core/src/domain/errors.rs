//! Errors - エラー型と分類
//!
//! # 分類（ErrorKind）
//! - NoMatch: dispatch / correlation のミス。例外ではなく呼び出し側が分岐する
//! - Format: payload のパース・エンコード失敗
//! - Communication: パートナーへの到達失敗（transport / timeout）
//! - ProtocolFault: パートナーが返した fault（payload 付き）
//! - Generic: 上記以外（redirect 非対応、未対応ステータス、内部処理エラーなど）

use thiserror::Error;

use super::ids::ExchangeId;
use super::state::ExchangeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoMatch,
    Format,
    Communication,
    ProtocolFault,
    Generic,
}

/// CourierError はクレート共通のエラー
#[derive(Debug, Error)]
pub enum CourierError {
    #[error("no match: {0}")]
    NoMatch(String),

    #[error("format error: {0}")]
    Format(String),

    #[error("communication error: {0}")]
    Communication(String),

    #[error("protocol fault: {0}")]
    Fault(String),

    #[error("invalid binding: {0}")]
    InvalidBinding(String),

    #[error("message exchange {0} not found")]
    ExchangeNotFound(ExchangeId),

    #[error("illegal transition for {id}: {from:?} -> {to:?}")]
    IllegalTransition {
        id: ExchangeId,
        from: ExchangeState,
        to: ExchangeState,
    },

    #[error("worker pool is shut down")]
    PoolClosed,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl CourierError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CourierError::NoMatch(_) => ErrorKind::NoMatch,
            CourierError::Format(_) => ErrorKind::Format,
            CourierError::Communication(_) | CourierError::PoolClosed => ErrorKind::Communication,
            CourierError::Fault(_) => ErrorKind::ProtocolFault,
            CourierError::InvalidBinding(_)
            | CourierError::ExchangeNotFound(_)
            | CourierError::IllegalTransition { .. }
            | CourierError::Config(_)
            | CourierError::Other(_) => ErrorKind::Generic,
        }
    }
}
