//! 列車制御の設定パラメータ（デフォルト値）

/// 停止から最高速までの +/- クリック数（デフォルト値）
pub const DEFAULT_STEPS: u8 = 12;

/// 列車が動き出す最小デューティ比 [%]（クローリング速度、キャリブレーションで変更可能）
pub const DEFAULT_CRAWL_THRESHOLD: u8 = 25;

/// 前進の最大デューティ比 [%]（脱線しない速度）
pub const DEFAULT_FORWARD_MAX: u8 = 75;

/// 後退の最大デューティ比 [%]（0 で後退禁止）
pub const DEFAULT_REVERSE_MAX: u8 = 35;

/// 加減速の応答性（1: 急峻 ～ 100: 緩やか、×10ms が制御周期）
pub const DEFAULT_ACCEL_RESPONSE: u8 = 20;

/// 加速の滑らかさ（大きいほど穏やか）
pub const DEFAULT_SMOOTH_ACCEL: u8 = 5;

/// 減速の滑らかさ（小さいほど応答が速い）
pub const DEFAULT_SMOOTH_DECEL: u8 = 3;

/// 停止後のブレーキ保持時間 [ms]（オーバーラン防止）
pub const DEFAULT_BRAKE_MS: u16 = 600;

/// +/- 長押し時の受付間隔 [ms]
pub const DEFAULT_BUTTON_DELAY_MS: u16 = 100;

/// フォロワーハブ用ブロードキャストチャネル
pub const DEFAULT_BROADCAST_CHANNEL: Option<u8> = Some(1);

/// モーターA/Bの回転方向（1: 時計回り, -1: 反時計回り）
pub const DEFAULT_MOTOR_DIRECTIONS: [i8; 2] = [-1, 1];

/// 無操作で電源を切るまでの時間 [分]
pub const DEFAULT_INACTIVITY_MINUTES: u16 = 5;

/// ハードウェア保護のためのデューティ比上限 [%]（設定値に関係なく常に適用）
pub const HARD_DUTY_LIMIT: i16 = 90;

/// ステップ数の上限（ランプテーブル容量）
pub const MAX_STEPS: u8 = 100;

/// 永続化できるクローリング速度の上限（2桁の10進数）
pub const CRAWL_RECORD_MAX: u8 = 29;

/// 入力・監視タイミング
pub mod timing {
    /// リモコンのポーリング周期 [ms]
    pub const POLL_MS: u64 = 50;

    /// ボタン長押し判定のポーリング周期 [ms]
    pub const HOLD_POLL_MS: u64 = 100;

    /// キャリブレーション中のポーリング周期 [ms]
    pub const CALIBRATE_POLL_MS: u64 = 100;

    /// 停止ボタン長押しでキャリブレーションに入るまでの回数
    pub const STOP_HOLD_POLLS: u8 = 5;

    /// センター長押しで電源を切るまでの回数
    pub const CENTER_HOLD_POLLS: u8 = 10;

    /// リモコン読み取り失敗時の待機時間 [ms]
    pub const INPUT_BACKOFF_MS: u64 = 1000;

    /// リモコン生存確認の周期 [ms]
    pub const PROBE_MS: u64 = 500;

    /// ハートビート周期 [ms]（1分）
    pub const HEARTBEAT_MS: u64 = 60_000;

    /// 起動時のリモコン接続待ち [ms]
    pub const CONNECT_TIMEOUT_MS: u64 = 10_000;
}

/// ブロードキャスト設定
pub mod broadcast {
    /// 送信周期 [ms]
    pub const PERIOD_MS: u64 = 100;

    /// 値が変化しないまま送信を停止するまでの周期数（省電力）
    pub const CLOSE_AFTER_TICKS: u8 = 3;

    /// シャットダウン通知の送信試行回数
    pub const SENTINEL_ATTEMPTS: u8 = 3;

    /// シャットダウン通知の再送間隔 [ms]
    pub const SENTINEL_RETRY_MS: u64 = 10;

    /// シャットダウン通知をフォロワーが受信するまでの待機時間 [ms]
    pub const SENTINEL_HOLD_MS: u64 = 200;
}

/// フォロワーハブ設定
pub mod follower {
    /// 受信ポーリング周期 [ms]
    pub const LISTEN_MS: u64 = 10;

    /// モーター更新周期 [ms]
    pub const DRIVE_MS: u64 = 10;
}
