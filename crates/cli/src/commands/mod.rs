//! # サブコマンド実装

pub mod ledger;
pub mod provenance;
