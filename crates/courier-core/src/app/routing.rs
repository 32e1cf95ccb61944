//! Routing - correlator の 2 段階プロトコル
//!
//! `Correlator` の各操作は単独ではマッチングを完結させません。
//! ここでは呼び出し順を固定した 2 つの入口を提供します。
//!
//! - インバウンド: `route_inbound` = `find_route` → 無ければ `enqueue_message`
//! - 待機登録: `register_interest` = `dequeue_message` → 無ければ `add_route`
//!
//! どちらも同じ correlator の排他範囲内で呼ぶこと。

use tracing::{debug, info};

use crate::domain::{CorrelationKey, ExchangeId, InstanceId, Route};
use crate::ports::Correlator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundRouting {
    /// 待機中の route が見つかった（route は残る）
    Matched {
        route: Route,
        key: Option<CorrelationKey>,
    },
    /// route が無いのでキューに積んだ
    Queued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    /// キュー済みメッセージを受け取った
    Delivered(ExchangeId),
    /// route を登録して待機
    Waiting,
}

/// インバウンドメッセージを配送先 route に割り当てる
///
/// 候補 key を順に試し、最初に見つかった route を返します。
/// key が 1 つも無いメッセージは key なし route（ワイルドカード）だけを探します。
pub fn route_inbound(
    correlator: &mut dyn Correlator,
    exchange: ExchangeId,
    keys: Vec<CorrelationKey>,
) -> InboundRouting {
    let matched = if keys.is_empty() {
        correlator.find_route(None).map(|r| (r.clone(), None))
    } else {
        keys.iter().find_map(|key| {
            correlator
                .find_route(Some(key))
                .map(|r| (r.clone(), Some(key.clone())))
        })
    };

    match matched {
        Some((route, key)) => {
            info!(
                correlator = %correlator.correlator_id(),
                mex = %exchange,
                target = %route.target,
                "inbound message matched a route"
            );
            InboundRouting::Matched { route, key }
        }
        None => {
            debug!(correlator = %correlator.correlator_id(), mex = %exchange, "no route, queueing");
            correlator.enqueue_message(exchange, keys);
            InboundRouting::Queued
        }
    }
}

/// インスタンスの待機を登録する（キュー済みメッセージがあれば即座に受け取る）
pub fn register_interest(
    correlator: &mut dyn Correlator,
    group_id: &str,
    target: InstanceId,
    index: i32,
    key: Option<CorrelationKey>,
) -> Interest {
    if let Some(exchange) = correlator.dequeue_message(key.as_ref()) {
        info!(
            correlator = %correlator.correlator_id(),
            mex = %exchange,
            target = %target,
            "queued message delivered on registration"
        );
        return Interest::Delivered(exchange);
    }
    correlator.add_route(group_id, target, index, key);
    Interest::Waiting
}
