//! Correlator port - 未マッチメッセージのキューと待機 route
//!
//! process 定義 × correlation set ごとに 1 つ存在します。
//!
//! # 2 段階プロトコル
//! `enqueue_message` は既存 route とのマッチングを行いません。
//! インバウンド側は先に `find_route` を引き、見つからなかったときだけ enqueue します。
//! 待機側は先に `dequeue_message` を引き、見つからなかったときだけ `add_route` します。
//! 順序を逆にすると、互換 route があるのにメッセージが待ち続けます。
//! この手順は `app::routing` にまとめてあります。
//!
//! # 排他
//! すべての操作は所有するトランザクションの排他範囲内で呼ばれる前提です。
//! 実装はロック保持中に I/O をしてはいけません。

use crate::domain::{CorrelationKey, CorrelatorId, ExchangeId, InstanceId, Route};
use crate::observability::CorrelatorStats;

pub trait Correlator: Send {
    fn correlator_id(&self) -> &CorrelatorId;

    /// 候補 key をすべて持たせてキュー末尾に追加（重複排除・マッチングはしない）
    fn enqueue_message(&mut self, exchange: ExchangeId, keys: Vec<CorrelationKey>);

    /// 古い順に走査し、`key` を候補に含む最初のメッセージを取り出す
    ///
    /// `key` が None のときは先頭のメッセージを無条件に取り出します。
    /// None の戻り値は「まだ待機中」であってエラーではありません。
    fn dequeue_message(&mut self, key: Option<&CorrelationKey>) -> Option<ExchangeId>;

    /// 登録順で最初にマッチする route（マッチしても削除しない）
    fn find_route(&self, key: Option<&CorrelationKey>) -> Option<&Route>;

    /// route を末尾に追加（同一 key の route が複数あってもよい）
    fn add_route(
        &mut self,
        group_id: &str,
        target: InstanceId,
        index: i32,
        key: Option<CorrelationKey>,
    );

    /// group が一致（None なら全 group）かつ target が一致する route をすべて削除
    ///
    /// 削除した件数を返します。
    fn remove_routes(&mut self, group_id: Option<&str>, target: InstanceId) -> usize;

    fn stats(&self) -> CorrelatorStats;
}
