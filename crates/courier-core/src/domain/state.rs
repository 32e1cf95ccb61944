//! State - message exchange の状態
//!
//! # 状態遷移
//! ```text
//! Pending ──(two-way, invoke)──▶ InFlight ──(reply)──▶ Replied | Faulted | Failed
//!    │
//!    ├──(one-way, invoke)──▶ Accepted ──(送信失敗)──▶ Failed
//!    └──(リクエスト構築失敗)──▶ Failed
//! ```
//!
//! InFlight / Accepted への遷移は invoke の中で同期的に起きる。
//! commit hook は呼び出しを worker pool に積むだけで、状態には触れない。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExchangeState {
    /// 作成直後。まだ送信していない
    Pending,
    /// 返信は非同期で届く
    InFlight,
    /// one-way の受理
    Accepted,
    Replied,
    Faulted,
    Failed,
}

impl ExchangeState {
    pub fn can_transition_to(self, next: ExchangeState) -> bool {
        use ExchangeState::*;
        matches!(
            (self, next),
            (Pending, InFlight)
                | (Pending, Accepted)
                | (Pending, Failed)
                | (InFlight, Replied)
                | (InFlight, Faulted)
                | (InFlight, Failed)
                | (Accepted, Failed)
        )
    }

    /// 返信が確定した状態
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExchangeState::Replied | ExchangeState::Faulted | ExchangeState::Failed
        )
    }
}
