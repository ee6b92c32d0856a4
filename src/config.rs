//! Configuration module
//!
//! このモジュールは列車制御の設定パラメータ、
//! およびクローリング速度の永続化機能を提供します。

pub mod driver;
pub mod eeprom;
pub mod params;
pub mod storage;

// params.rsから主要な定数を再エクスポート
pub use params::*;

// driver.rsから設定構造体を再エクスポート
pub use driver::{DriverConfig, FollowerConfig};

// storage.rsから構造体を再エクスポート
pub use storage::CalibrationRecord;

// eepromモジュールの主要な関数を再エクスポート
pub use eeprom::{load_crawl_threshold, read_crawl_threshold, write_crawl_threshold};
