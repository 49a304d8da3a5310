//! # Gatewayエンドポイント

pub mod generate;
pub mod health;
pub mod verify;

pub use generate::handle_generate;
pub use health::handle_health;
pub use verify::handle_verify;
