//! クローリング速度の永続化レコード
//!
//! ハブのユーザーストレージに4バイトで保存します。
//! 形式: タグ `b"dc"` + 2桁のASCII 10進数（00～29）

use super::params::CRAWL_RECORD_MAX;

/// レコード識別タグ
pub const RECORD_TAG: [u8; 2] = *b"dc";

/// レコード長 [byte]
pub const RECORD_LEN: usize = 4;

/// レコード解析のエラー型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// タグ不一致（未保存）
    InvalidTag,

    /// 数字以外の文字
    InvalidDigits,

    /// 値が範囲外
    OutOfRange,
}

/// 保存されたクローリング速度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationRecord {
    crawl_threshold: u8,
}

impl CalibrationRecord {
    /// レコードを作成（範囲外の値は `None`）
    pub const fn new(crawl_threshold: u8) -> Option<Self> {
        if crawl_threshold > CRAWL_RECORD_MAX {
            None
        } else {
            Some(Self { crawl_threshold })
        }
    }

    pub const fn crawl_threshold(&self) -> u8 {
        self.crawl_threshold
    }

    /// バイト列に変換
    pub const fn encode(&self) -> [u8; RECORD_LEN] {
        [
            RECORD_TAG[0],
            RECORD_TAG[1],
            b'0' + self.crawl_threshold / 10,
            b'0' + self.crawl_threshold % 10,
        ]
    }

    /// バイト列から復元
    pub fn decode(bytes: &[u8; RECORD_LEN]) -> Result<Self, RecordError> {
        if bytes[..2] != RECORD_TAG {
            return Err(RecordError::InvalidTag);
        }
        if !bytes[2].is_ascii_digit() || !bytes[3].is_ascii_digit() {
            return Err(RecordError::InvalidDigits);
        }

        let value = (bytes[2] - b'0') * 10 + (bytes[3] - b'0');
        Self::new(value).ok_or(RecordError::OutOfRange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let record = CalibrationRecord::new(7).unwrap();
        assert_eq!(&record.encode(), b"dc07");
        assert_eq!(&CalibrationRecord::new(25).unwrap().encode(), b"dc25");
    }

    #[test]
    fn test_decode_stored_value() {
        let record = CalibrationRecord::decode(b"dc18").unwrap();
        assert_eq!(record.crawl_threshold(), 18);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(CalibrationRecord::decode(b"\0\0\0\0"), Err(RecordError::InvalidTag));
        assert_eq!(CalibrationRecord::decode(b"xx12"), Err(RecordError::InvalidTag));
        assert_eq!(CalibrationRecord::decode(b"dc1a"), Err(RecordError::InvalidDigits));
        assert_eq!(CalibrationRecord::decode(b"dc30"), Err(RecordError::OutOfRange));
        assert_eq!(CalibrationRecord::decode(b"dc99"), Err(RecordError::OutOfRange));
    }

    #[test]
    fn test_out_of_range_record_not_created() {
        assert!(CalibrationRecord::new(30).is_none());
        assert!(CalibrationRecord::new(CRAWL_RECORD_MAX).is_some());
    }
}
