//! セッション共有状態管理
//!
//! リモコン接続ごとに1つの `Session` を作成し、同じタスクグループ内の全タスクに
//! 参照で渡します。タスクは単一スレッドで協調的に実行されるため、各フィールドは
//! `Cell` で保持し、読み出し・更新の間に await を挟まないことで整合性を保ちます。
//!
//! フィールドごとの書き込み担当:
//! - `clicks`: コントローラ（キャリブレーション含む）、ドライブの逆転リミット時のみ +1
//! - `duty`: ドライブのみ
//! - `status`: インジケータ（コントローラから呼ばれる）
//! - `crawl_threshold` / `ramp`: キャリブレーションのみ
//! - `heartbeat`: ハートビート（コントローラがボタン操作でリセット）
//! - `connected`: 生存確認のみ

use core::cell::{Cell, RefCell};

use crate::config::DriverConfig;
use crate::drive::{RampMode, RampProfile};
use crate::heartbeat::Heartbeat;

/// ステータスライトの表示レベル
///
/// 色や明るさへの対応付けはハードウェア側で行います。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// 停車中・待機
    Ready,
    /// クローリング速度（1クリック目）
    Crawl,
    Go1,
    Go2,
    Go3,
    Go4,
    /// ブレーキ中
    Stop,
    /// クローリング速度のキャリブレーション中
    Calibrate,
}

impl Status {
    /// クリック数に応じた走行ステータス
    pub const fn for_clicks(clicks: i16) -> Self {
        match clicks.unsigned_abs() {
            0 => Status::Ready,
            1 => Status::Crawl,
            2 => Status::Go1,
            3 => Status::Go2,
            4 => Status::Go3,
            _ => Status::Go4,
        }
    }

    /// 同期パケット上のステータスコード
    pub const fn code(self) -> u8 {
        match self {
            Status::Ready => 0,
            Status::Crawl => 1,
            Status::Go1 => 2,
            Status::Go2 => 3,
            Status::Go3 => 4,
            Status::Go4 => 5,
            Status::Stop => 6,
            Status::Calibrate => 7,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Status::Ready),
            1 => Some(Status::Crawl),
            2 => Some(Status::Go1),
            3 => Some(Status::Go2),
            4 => Some(Status::Go3),
            5 => Some(Status::Go4),
            6 => Some(Status::Stop),
            7 => Some(Status::Calibrate),
            _ => None,
        }
    }
}

/// タスクグループの終了理由
///
/// 最初に終了したタスクの戻り値が、スーパーバイザーの合流点に届きます。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEnd {
    /// リモコンとの接続が切れた（再接続する）
    LinkLost,
    /// センター短押し：制御プログラムのみ終了
    CloseProgram,
    /// 電源オフを実行した
    PowerOff,
}

/// 1回の接続分の制御状態
pub struct Session {
    clicks: Cell<i16>,
    duty: Cell<i16>,
    status: Cell<Status>,
    crawl_threshold: Cell<u8>,
    ramp: RefCell<RampProfile>,
    heartbeat: Heartbeat,
    connected: Cell<bool>,
    max_clicks: i16,
    forward_max: u8,
    steps: u8,
}

impl Session {
    /// 停車状態の新しいセッションを作成
    pub fn new(config: &DriverConfig, crawl_threshold: u8) -> Self {
        Self {
            clicks: Cell::new(0),
            duty: Cell::new(0),
            status: Cell::new(Status::Ready),
            crawl_threshold: Cell::new(crawl_threshold),
            ramp: RefCell::new(RampProfile::build(
                RampMode::Run,
                crawl_threshold,
                config.forward_max,
                config.steps,
            )),
            heartbeat: Heartbeat::new(config.inactivity_minutes),
            connected: Cell::new(true),
            max_clicks: config.max_clicks(),
            forward_max: config.forward_max,
            steps: config.steps,
        }
    }

    pub fn clicks(&self) -> i16 {
        self.clicks.get()
    }

    /// クリック数を直接設定
    ///
    /// キャリブレーション中は試行値をそのままクリック数として使うため、範囲制限しません。
    pub fn set_clicks(&self, clicks: i16) {
        self.clicks.set(clicks);
    }

    /// クリック数を増減（±(steps+1) に制限）
    pub fn step_clicks(&self, delta: i16) -> i16 {
        let clicks = self
            .clicks
            .get()
            .saturating_add(delta)
            .clamp(-self.max_clicks, self.max_clicks);
        self.clicks.set(clicks);
        clicks
    }

    pub fn duty(&self) -> i16 {
        self.duty.get()
    }

    pub fn set_duty(&self, duty: i16) {
        self.duty.set(duty);
    }

    pub fn status(&self) -> Status {
        self.status.get()
    }

    pub fn set_status(&self, status: Status) {
        self.status.set(status);
    }

    pub fn crawl_threshold(&self) -> u8 {
        self.crawl_threshold.get()
    }

    pub fn set_crawl_threshold(&self, crawl_threshold: u8) {
        self.crawl_threshold.set(crawl_threshold);
    }

    /// 現在のクローリング速度でランプを再構築
    pub fn rebuild_ramp(&self, mode: RampMode) {
        let ramp = RampProfile::build(mode, self.crawl_threshold.get(), self.forward_max, self.steps);
        *self.ramp.borrow_mut() = ramp;
    }

    /// 現在のクリック数に対する目標デューティ比
    pub fn target(&self) -> i16 {
        self.ramp.borrow().target(self.clicks.get())
    }

    pub fn heartbeat(&self) -> &Heartbeat {
        &self.heartbeat
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }
}
