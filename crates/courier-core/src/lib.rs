//! courier-core
//!
//! Core building blocks for the Courier message coordinator.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, xml, message, correlation, exchange, partner link, service metadata）
//! - **ports**: 抽象化レイヤー（Correlator, Scheduler, ExchangeStore, HttpTransport, MessageConverter, など）
//! - **app**: アプリケーションロジック（builder, dispatch, routing, worker pool, external services）
//! - **impls**: 実装（InMemoryCorrelator, ReqwestTransport, DocLiteralConverter など）
//! - **config**: 実行時設定
//! - **observability**: 件数・統計のビュー

pub mod domain;
pub mod ports;
pub mod app;
pub mod impls;
pub mod config;
pub mod observability;
