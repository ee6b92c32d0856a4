//! リモコン式列車コントローラ
//!
//! ハンドヘルドリモコンのボタン入力を、慣性を模擬したモーターのデューティ比に変換します。
//! リモコンのないフォロワーハブへ無線ブロードキャストで同期することもできます。
//!
//! ハードウェアは `hal` のトレイト越しに扱い、タスクは embassy の
//! タイマーと `select` で協調的に実行します。

#![cfg_attr(not(any(test, feature = "std")), no_std)]

// fmt must come first so its macros are visible to the other modules
mod fmt;

pub mod calibration;
pub mod config;
pub mod drive;
pub mod follower;
pub mod hal;
pub mod heartbeat;
pub mod indicator;
pub mod motor;
pub mod state;
pub mod supervisor;
pub mod sync_protocol;
pub mod tasks;

#[cfg(any(test, feature = "std"))]
pub mod sim;

pub use supervisor::{DriverError, ReconnectSupervisor};
