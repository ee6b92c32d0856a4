//! ハブのユーザーストレージを使ったクローリング速度の保存と読み込み
//!
//! 起動時に1回だけ読み込み、キャリブレーション確定時にだけ書き込みます。

use super::storage::{CalibrationRecord, RECORD_LEN};
use crate::fmt::*;
use crate::hal::{Hub, StorageError};

/// レコードの保存位置（ストレージ先頭）
pub const RECORD_OFFSET: usize = 0;

/// ストレージからクローリング速度を読み込む
///
/// # Returns
/// * `Ok(Some(u8))` - 保存されていた値
/// * `Ok(None)` - 未保存、または破損・範囲外のレコード
/// * `Err(StorageError)` - 読み込み失敗
pub fn read_crawl_threshold<H: Hub>(hub: &H) -> Result<Option<u8>, StorageError> {
    let mut buffer = [0u8; RECORD_LEN];
    hub.read_storage(RECORD_OFFSET, &mut buffer)?;

    match CalibrationRecord::decode(&buffer) {
        Ok(record) => Ok(Some(record.crawl_threshold())),
        Err(e) => {
            warn!("Stored crawl threshold not found ({:?}), record={:?}", e, buffer);
            Ok(None)
        }
    }
}

/// クローリング速度をストレージに書き込む
pub fn write_crawl_threshold<H: Hub>(hub: &H, crawl_threshold: u8) -> Result<(), StorageError> {
    let record = CalibrationRecord::new(crawl_threshold).ok_or(StorageError::OutOfRange)?;
    let data = record.encode();

    info!("Writing crawl threshold {} to hub storage", crawl_threshold);
    hub.write_storage(RECORD_OFFSET, &data).map_err(|e| {
        error!("Storage write failed: {:?}", e);
        e
    })
}

/// クローリング速度を読み込み、失敗時は既定値を使う
pub fn load_crawl_threshold<H: Hub>(hub: &H, fallback: u8) -> u8 {
    match read_crawl_threshold(hub) {
        Ok(Some(crawl_threshold)) => {
            info!(
                "Using stored crawl threshold {} - recalibrate to override",
                crawl_threshold
            );
            crawl_threshold
        }
        Ok(None) => {
            info!("Using default crawl threshold {}", fallback);
            fallback
        }
        Err(e) => {
            error!("Failed to read storage: {:?}, using default {}", e, fallback);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimHub;

    #[test]
    fn test_load_falls_back_when_empty() {
        let hub = SimHub::new();
        assert_eq!(load_crawl_threshold(&hub, 25), 25);
    }

    #[test]
    fn test_write_then_load() {
        let hub = SimHub::new();
        write_crawl_threshold(&hub, 17).unwrap();
        assert_eq!(&hub.storage()[..4], b"dc17");
        assert_eq!(load_crawl_threshold(&hub, 25), 17);
    }

    #[test]
    fn test_repeated_commit_is_identical() {
        let hub = SimHub::new();
        write_crawl_threshold(&hub, 12).unwrap();
        let first = hub.storage();
        write_crawl_threshold(&hub, 12).unwrap();
        assert_eq!(hub.storage(), first);
    }

    #[test]
    fn test_out_of_range_record_falls_back() {
        let hub = SimHub::with_storage(b"dc42");
        assert_eq!(load_crawl_threshold(&hub, 25), 25);
    }

    #[test]
    fn test_write_rejects_unstorable_value() {
        let hub = SimHub::new();
        assert_eq!(write_crawl_threshold(&hub, 30), Err(StorageError::OutOfRange));
    }

    #[test]
    fn test_read_error_falls_back() {
        let hub = SimHub::new();
        hub.fail_storage(true);
        assert_eq!(load_crawl_threshold(&hub, 20), 20);
    }
}
