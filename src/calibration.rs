//! クローリング速度のキャリブレーション
//!
//! 停止ボタン長押しで開始し、+/- で試行値 `vc` を調整して列車がぎりぎり動き出す
//! デューティ比を探します。停止ボタンで確定すると、その値が新しいクローリング速度になります。
//!
//! ボタン入力から状態遷移を求める部分だけをここに置き、ランプ再構築・永続化・
//! ステータス表示は `tasks::calibration` が行います。

use crate::config::CRAWL_RECORD_MAX;
use crate::hal::Buttons;

/// キャリブレーションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationPhase {
    /// 開始直後（試行値 0）
    Armed,
    /// 試行値を調整中
    Adjusting,
    /// 確定済み
    Committed,
}

/// ボタン入力1回分の処理結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationEvent {
    /// 変化なし
    None,
    /// 試行値が変わった（モーターに反映する）
    Trial(u8),
    /// 試行値で確定した
    Commit(u8),
}

/// キャリブレーション状態機械
#[derive(Debug, Clone, Copy)]
pub struct CrawlCalibration {
    phase: CalibrationPhase,
    trial: u8,
    limit: u8,
}

impl CrawlCalibration {
    /// 試行値の上限を永続化レコードの上限に合わせて作成
    pub const fn new() -> Self {
        Self::with_limit(CRAWL_RECORD_MAX)
    }

    pub const fn with_limit(limit: u8) -> Self {
        Self {
            phase: CalibrationPhase::Armed,
            trial: 0,
            limit,
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn trial(&self) -> u8 {
        self.trial
    }

    /// ボタンのスナップショットを1回分処理
    ///
    /// + と - が同時に押された場合は + を優先します。
    /// 試行値 0 での停止ボタンは無視します（確定できる値がないため）。
    pub fn handle(&mut self, buttons: Buttons) -> CalibrationEvent {
        if self.phase == CalibrationPhase::Committed {
            return CalibrationEvent::None;
        }

        if buttons.contains(Buttons::PLUS) {
            if self.trial < self.limit {
                self.trial += 1;
            }
            self.phase = CalibrationPhase::Adjusting;
            return CalibrationEvent::Trial(self.trial);
        }

        if buttons.contains(Buttons::MINUS) {
            self.trial = self.trial.saturating_sub(1);
            self.phase = CalibrationPhase::Adjusting;
            return CalibrationEvent::Trial(self.trial);
        }

        if buttons.contains(Buttons::STOP) && self.trial > 0 {
            self.phase = CalibrationPhase::Committed;
            return CalibrationEvent::Commit(self.trial);
        }

        CalibrationEvent::None
    }
}

impl Default for CrawlCalibration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalibrationRecord;

    #[test]
    fn test_adjust_and_commit() {
        let mut cal = CrawlCalibration::new();
        assert_eq!(cal.phase(), CalibrationPhase::Armed);

        assert_eq!(cal.handle(Buttons::PLUS), CalibrationEvent::Trial(1));
        assert_eq!(cal.handle(Buttons::PLUS), CalibrationEvent::Trial(2));
        assert_eq!(cal.handle(Buttons::PLUS), CalibrationEvent::Trial(3));
        assert_eq!(cal.handle(Buttons::MINUS), CalibrationEvent::Trial(2));
        assert_eq!(cal.phase(), CalibrationPhase::Adjusting);

        assert_eq!(cal.handle(Buttons::STOP), CalibrationEvent::Commit(2));
        assert_eq!(cal.phase(), CalibrationPhase::Committed);
        assert_eq!(cal.handle(Buttons::PLUS), CalibrationEvent::None);
    }

    #[test]
    fn test_trial_floor_and_ceiling() {
        let mut cal = CrawlCalibration::with_limit(2);
        assert_eq!(cal.handle(Buttons::MINUS), CalibrationEvent::Trial(0));
        cal.handle(Buttons::PLUS);
        cal.handle(Buttons::PLUS);
        assert_eq!(cal.handle(Buttons::PLUS), CalibrationEvent::Trial(2));
    }

    #[test]
    fn test_stop_without_trial_is_ignored() {
        let mut cal = CrawlCalibration::new();
        assert_eq!(cal.handle(Buttons::STOP), CalibrationEvent::None);
        assert_eq!(cal.handle(Buttons::empty()), CalibrationEvent::None);
        assert_eq!(cal.phase(), CalibrationPhase::Armed);
    }

    #[test]
    fn test_commit_is_idempotent() {
        let commit = |presses: usize| {
            let mut cal = CrawlCalibration::new();
            for _ in 0..presses {
                cal.handle(Buttons::PLUS);
            }
            match cal.handle(Buttons::STOP) {
                CalibrationEvent::Commit(vc) => CalibrationRecord::new(vc).map(|r| r.encode()),
                _ => None,
            }
        };

        assert_eq!(commit(18), Some(*b"dc18"));
        assert_eq!(commit(18), commit(18));
    }

    #[test]
    fn test_trial_is_capped_at_record_limit() {
        let mut cal = CrawlCalibration::new();
        for _ in 0..40 {
            cal.handle(Buttons::PLUS);
        }
        assert_eq!(cal.trial(), CRAWL_RECORD_MAX);
    }
}
