//! 実行時設定
//!
//! params.rs のデフォルト値をまとめ、ユーザー指定値の範囲チェックを行います。

use embassy_time::Duration;

use super::params::{self, broadcast, follower, timing};
use crate::fmt::*;
use crate::motor::Direction;

/// リーダーハブ（リモコン付き）の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverConfig {
    /// 停止から最高速までのクリック数
    pub steps: u8,
    /// クローリング速度 [%]（保存値がない場合に使用）
    pub crawl_threshold: u8,
    /// 前進の最大デューティ比 [%]
    pub forward_max: u8,
    /// 後退の最大デューティ比 [%]
    pub reverse_max: u8,
    /// 加減速の応答性（×10ms）
    pub accel_response: u8,
    /// 加速の滑らかさ
    pub smooth_accel: u8,
    /// 減速の滑らかさ
    pub smooth_decel: u8,
    /// ブレーキ保持時間 [ms]
    pub brake_ms: u16,
    /// ボタン受付間隔 [ms]
    pub button_delay_ms: u16,
    /// フォロワー用ブロードキャストチャネル（`None` で無効）
    pub broadcast_channel: Option<u8>,
    /// モーターA/Bの回転方向（1 / -1）
    pub motor_directions: [i8; 2],
    /// 無操作シャットダウンまでの時間 [分]
    pub inactivity_minutes: u16,

    // === タイミング ===
    pub poll_period: Duration,
    pub hold_poll: Duration,
    pub calibrate_poll: Duration,
    pub stop_hold_polls: u8,
    pub center_hold_polls: u8,
    pub input_backoff: Duration,
    pub probe_period: Duration,
    pub heartbeat_period: Duration,
    pub broadcast_period: Duration,
    pub sentinel_hold: Duration,
    /// 起動時のリモコン接続待ち（`None` で無期限）
    pub connect_timeout: Option<Duration>,
    /// 再接続時のリモコン接続待ち（`None` で無期限）
    pub reconnect_timeout: Option<Duration>,
}

impl DriverConfig {
    /// デフォルト設定を生成（params.rsの値を使用）
    pub const fn default() -> Self {
        Self {
            steps: params::DEFAULT_STEPS,
            crawl_threshold: params::DEFAULT_CRAWL_THRESHOLD,
            forward_max: params::DEFAULT_FORWARD_MAX,
            reverse_max: params::DEFAULT_REVERSE_MAX,
            accel_response: params::DEFAULT_ACCEL_RESPONSE,
            smooth_accel: params::DEFAULT_SMOOTH_ACCEL,
            smooth_decel: params::DEFAULT_SMOOTH_DECEL,
            brake_ms: params::DEFAULT_BRAKE_MS,
            button_delay_ms: params::DEFAULT_BUTTON_DELAY_MS,
            broadcast_channel: params::DEFAULT_BROADCAST_CHANNEL,
            motor_directions: params::DEFAULT_MOTOR_DIRECTIONS,
            inactivity_minutes: params::DEFAULT_INACTIVITY_MINUTES,
            poll_period: Duration::from_millis(timing::POLL_MS),
            hold_poll: Duration::from_millis(timing::HOLD_POLL_MS),
            calibrate_poll: Duration::from_millis(timing::CALIBRATE_POLL_MS),
            stop_hold_polls: timing::STOP_HOLD_POLLS,
            center_hold_polls: timing::CENTER_HOLD_POLLS,
            input_backoff: Duration::from_millis(timing::INPUT_BACKOFF_MS),
            probe_period: Duration::from_millis(timing::PROBE_MS),
            heartbeat_period: Duration::from_millis(timing::HEARTBEAT_MS),
            broadcast_period: Duration::from_millis(broadcast::PERIOD_MS),
            sentinel_hold: Duration::from_millis(broadcast::SENTINEL_HOLD_MS),
            connect_timeout: Some(Duration::from_millis(timing::CONNECT_TIMEOUT_MS)),
            reconnect_timeout: None,
        }
    }

    /// テスト・シミュレーション用の短い周期の設定
    ///
    /// 制御ロジックの値はデフォルトのまま、待ち時間だけをミリ秒単位に縮めます。
    /// モーター方向は両チャネルとも時計回りです。
    #[cfg(any(test, feature = "std"))]
    pub const fn fast() -> Self {
        let mut config = Self::default();
        config.accel_response = 1;
        config.brake_ms = 5;
        config.button_delay_ms = 2;
        config.motor_directions = [1, 1];
        config.poll_period = Duration::from_millis(1);
        config.hold_poll = Duration::from_millis(1);
        config.calibrate_poll = Duration::from_millis(1);
        config.input_backoff = Duration::from_millis(5);
        config.probe_period = Duration::from_millis(3);
        config.heartbeat_period = Duration::from_millis(20);
        config.broadcast_period = Duration::from_millis(2);
        config.sentinel_hold = Duration::from_millis(2);
        config.connect_timeout = Some(Duration::from_millis(50));
        config.reconnect_timeout = Some(Duration::from_millis(50));
        config
    }

    /// ユーザー指定値の範囲チェック
    ///
    /// 範囲外の値は安全な値に置き換え、警告を出力します。
    pub fn sanitize(mut self) -> Self {
        if !(5..=params::MAX_STEPS).contains(&self.steps) {
            warn!("sanity check: steps {} invalid - reset to 10", self.steps);
            self.steps = 10;
        }
        if !(10..=40).contains(&self.crawl_threshold) {
            warn!(
                "sanity check: crawl threshold {} invalid - reset to {}",
                self.crawl_threshold,
                params::DEFAULT_CRAWL_THRESHOLD
            );
            self.crawl_threshold = params::DEFAULT_CRAWL_THRESHOLD;
        }
        if !(41..=params::HARD_DUTY_LIMIT as u8).contains(&self.forward_max) {
            warn!(
                "sanity check: forward max {} invalid - reset to {}",
                self.forward_max,
                params::DEFAULT_FORWARD_MAX
            );
            self.forward_max = params::DEFAULT_FORWARD_MAX;
        }
        if self.reverse_max > params::HARD_DUTY_LIMIT as u8 {
            warn!("sanity check: reverse max {} invalid - reset to 70", self.reverse_max);
            self.reverse_max = 70;
        }
        if !(1..=100).contains(&self.accel_response) {
            warn!(
                "sanity check: accel response {} invalid - reset to {}",
                self.accel_response,
                params::DEFAULT_ACCEL_RESPONSE
            );
            self.accel_response = params::DEFAULT_ACCEL_RESPONSE;
        }
        if !(1..=10).contains(&self.smooth_accel) {
            warn!("sanity check: smooth accel {} invalid - reset", self.smooth_accel);
            self.smooth_accel = params::DEFAULT_SMOOTH_ACCEL;
        }
        if !(1..=10).contains(&self.smooth_decel) {
            warn!("sanity check: smooth decel {} invalid - reset", self.smooth_decel);
            self.smooth_decel = params::DEFAULT_SMOOTH_DECEL;
        }
        if !(1..=2000).contains(&self.brake_ms) {
            warn!("sanity check: brake {} ms invalid - reset to 700", self.brake_ms);
            self.brake_ms = 700;
        }
        if self.inactivity_minutes == 0 {
            warn!(
                "sanity check: inactivity 0 min invalid - reset to {}",
                params::DEFAULT_INACTIVITY_MINUTES
            );
            self.inactivity_minutes = params::DEFAULT_INACTIVITY_MINUTES;
        }
        self.motor_directions = sanitize_directions(self.motor_directions);
        self
    }

    /// 加減速の制御周期
    pub fn drive_period(&self) -> Duration {
        Duration::from_millis(self.accel_response as u64 * 10)
    }

    /// ブレーキ保持時間
    pub fn brake(&self) -> Duration {
        Duration::from_millis(self.brake_ms as u64)
    }

    /// ボタン受付間隔
    pub fn button_delay(&self) -> Duration {
        Duration::from_millis(self.button_delay_ms as u64)
    }

    /// クリック数の上限（±）
    pub fn max_clicks(&self) -> i16 {
        self.steps as i16 + 1
    }

    /// モーターA/Bの回転方向
    pub fn directions(&self) -> [Direction; 2] {
        [
            Direction::from_sign(self.motor_directions[0]),
            Direction::from_sign(self.motor_directions[1]),
        ]
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::default()
    }
}

/// フォロワーハブ（モーターのみ）の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowerConfig {
    /// 受信チャネル（リーダーのブロードキャストチャネルと一致させる）
    pub observe_channel: u8,
    /// モーターA/Bの回転方向（1 / -1）
    pub motor_directions: [i8; 2],
    /// 無操作シャットダウンまでの時間 [分]
    pub inactivity_minutes: u16,
    pub listen_period: Duration,
    pub drive_period: Duration,
    pub heartbeat_period: Duration,
}

impl FollowerConfig {
    pub const fn default() -> Self {
        Self {
            observe_channel: 1,
            motor_directions: params::DEFAULT_MOTOR_DIRECTIONS,
            inactivity_minutes: params::DEFAULT_INACTIVITY_MINUTES,
            listen_period: Duration::from_millis(follower::LISTEN_MS),
            drive_period: Duration::from_millis(follower::DRIVE_MS),
            heartbeat_period: Duration::from_millis(timing::HEARTBEAT_MS),
        }
    }

    #[cfg(any(test, feature = "std"))]
    pub const fn fast() -> Self {
        let mut config = Self::default();
        config.motor_directions = [1, 1];
        config.listen_period = Duration::from_millis(1);
        config.drive_period = Duration::from_millis(1);
        config.heartbeat_period = Duration::from_millis(20);
        config
    }

    pub fn sanitize(mut self) -> Self {
        if self.inactivity_minutes == 0 {
            warn!(
                "sanity check: inactivity 0 min invalid - reset to {}",
                params::DEFAULT_INACTIVITY_MINUTES
            );
            self.inactivity_minutes = params::DEFAULT_INACTIVITY_MINUTES;
        }
        self.motor_directions = sanitize_directions(self.motor_directions);
        self
    }

    pub fn directions(&self) -> [Direction; 2] {
        [
            Direction::from_sign(self.motor_directions[0]),
            Direction::from_sign(self.motor_directions[1]),
        ]
    }
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self::default()
    }
}

/// 方向は 1 / -1 のみ有効（範囲外はA=1, B=-1に戻す）
fn sanitize_directions(directions: [i8; 2]) -> [i8; 2] {
    let fallback = [1, -1];
    let mut result = directions;
    for (i, dir) in result.iter_mut().enumerate() {
        if *dir != 1 && *dir != -1 {
            warn!(
                "sanity check: motor {} direction {} invalid - reset to {}",
                i,
                *dir,
                fallback[i]
            );
            *dir = fallback[i];
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DriverConfig::default();
        assert_eq!(config.steps, 12);
        assert_eq!(config.crawl_threshold, 25);
        assert_eq!(config.drive_period(), Duration::from_millis(200));
        assert_eq!(config.max_clicks(), 13);
        assert_eq!(config.broadcast_channel, Some(1));
    }

    #[test]
    fn test_default_survives_sanitize() {
        let config = DriverConfig::default();
        assert_eq!(config.sanitize(), config);
    }

    #[test]
    fn test_sanitize_resets_out_of_range_values() {
        let mut config = DriverConfig::default();
        config.steps = 3;
        config.crawl_threshold = 55;
        config.forward_max = 95;
        config.reverse_max = 120;
        config.brake_ms = 0;
        config.motor_directions = [0, 2];

        let config = config.sanitize();
        assert_eq!(config.steps, 10);
        assert_eq!(config.crawl_threshold, 25);
        assert_eq!(config.forward_max, 75);
        assert_eq!(config.reverse_max, 70);
        assert_eq!(config.brake_ms, 700);
        assert_eq!(config.motor_directions, [1, -1]);
    }

    #[test]
    fn test_zero_reverse_max_is_valid() {
        let mut config = DriverConfig::default();
        config.reverse_max = 0;
        assert_eq!(config.sanitize().reverse_max, 0);
    }
}
