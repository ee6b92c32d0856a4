//! 再接続スーパーバイザー
//!
//! リモコンの接続 → タスクグループ実行 → 切断時は再接続、を繰り返します。
//! 接続ごとに新しい `Session` を作成し、前回のクリック数やデューティ比は引き継ぎません。
//! クローリング速度はハブの設定値として接続をまたいで保持します。
//!
//! ```text
//! Acquiring --(接続)--> Running --(LinkLost)--> Acquiring
//!     |                    |
//!     +--(失敗)--> 電源オフ  +--(CloseProgram / PowerOff)--> 終了
//! ```

use embassy_time::with_timeout;

use crate::config::{load_crawl_threshold, DriverConfig};
use crate::fmt::*;
use crate::hal::{Hub, LinkError, Motor, Radio, RemoteConnector};
use crate::indicator::transport_gate;
use crate::motor::MotorPair;
use crate::state::{Session, SessionEnd, Status};
use crate::sync_protocol::{encode_packet, SyncPacket};
use crate::tasks::shutdown::power_down;
use crate::tasks::{run_group, TaskContext};

/// スーパーバイザーのエラー型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// リモコンが見つからなかった（ハブの電源は切断済み）
    RemoteNotFound,
}

/// スーパーバイザーの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupervisorState {
    /// リモコン接続待ち
    Acquiring,
    /// タスクグループ実行中
    Running,
}

pub struct ReconnectSupervisor<'a, C, H, B, M> {
    config: &'a DriverConfig,
    connector: &'a mut C,
    hub: &'a H,
    radio: Option<&'a B>,
    motors: &'a MotorPair<M>,
    crawl_threshold: u8,
    state: SupervisorState,
    sessions: u32,
}

impl<'a, C, H, B, M> ReconnectSupervisor<'a, C, H, B, M>
where
    C: RemoteConnector,
    H: Hub,
    B: Radio,
    M: Motor,
{
    /// スーパーバイザーを作成
    ///
    /// 保存済みのクローリング速度をここで1回だけ読み込みます。
    /// ブロードキャストチャネルが未設定の場合、`radio` は使用しません。
    pub fn new(
        config: &'a DriverConfig,
        connector: &'a mut C,
        hub: &'a H,
        radio: Option<&'a B>,
        motors: &'a MotorPair<M>,
    ) -> Self {
        let crawl_threshold = load_crawl_threshold(hub, config.crawl_threshold);

        Self {
            config,
            connector,
            hub,
            radio: config.broadcast_channel.and(radio),
            motors,
            crawl_threshold,
            state: SupervisorState::Acquiring,
            sessions: 0,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn crawl_threshold(&self) -> u8 {
        self.crawl_threshold
    }

    /// 制御プログラムを実行
    ///
    /// # Returns
    /// * `Ok(SessionEnd)` - センターボタンまたは無操作による終了
    /// * `Err(DriverError::RemoteNotFound)` - リモコン接続失敗（電源オフ済み）
    pub async fn run(&mut self) -> Result<SessionEnd, DriverError> {
        info!(
            "Supervisor started: crawl threshold={}, {} motor(s), broadcast={}",
            self.crawl_threshold,
            self.motors.channel_count(),
            self.radio.is_some()
        );

        loop {
            self.state = SupervisorState::Acquiring;

            let remote = match self.acquire().await {
                Ok(remote) => remote,
                Err(e) => {
                    error!("Remote not found ({:?}) - shutting down", e);
                    let gate = transport_gate();
                    power_down(self.hub, self.radio, &gate, self.config.sentinel_hold).await;
                    return Err(DriverError::RemoteNotFound);
                }
            };

            self.state = SupervisorState::Running;
            let end = self.run_session(&remote).await;

            // タスクグループ破棄時点ではまだ減速中の場合がある
            self.motors.stop();

            match end {
                SessionEnd::LinkLost => {
                    warn!("Remote disconnected - motors stopped, reconnecting");
                    self.publish_stop().await;
                }
                SessionEnd::CloseProgram => {
                    self.publish_stop().await;
                    info!("Program finished: {:?}", end);
                    return Ok(end);
                }
                // フォロワーにはシャットダウン通知を送信済み
                SessionEnd::PowerOff => {
                    info!("Program finished: {:?}", end);
                    return Ok(end);
                }
            }
        }
    }

    /// リモコンに接続（初回と再接続でタイムアウトを切り替え）
    async fn acquire(&mut self) -> Result<C::Remote, LinkError> {
        let timeout = if self.sessions == 0 {
            self.config.connect_timeout
        } else {
            self.config.reconnect_timeout
        };

        info!("Waiting for remote (attempt {})", self.sessions + 1);
        match timeout {
            Some(timeout) => with_timeout(timeout, self.connector.connect())
                .await
                .unwrap_or(Err(LinkError::Timeout)),
            None => self.connector.connect().await,
        }
    }

    /// 新しいセッションでタスクグループを実行
    async fn run_session(&mut self, remote: &C::Remote) -> SessionEnd {
        self.sessions += 1;
        info!("Remote connected - session {}", self.sessions);

        let session = Session::new(self.config, self.crawl_threshold);
        let gate = transport_gate();
        let ctx = TaskContext {
            config: self.config,
            session: &session,
            remote,
            hub: self.hub,
            radio: self.radio,
            motors: self.motors,
            gate: &gate,
        };

        ctx.indicator().show(Status::Ready).await;
        let end = run_group(&ctx).await;

        // キャリブレーション途中で終了した場合は以前の値を使う
        let crawl_threshold = session.crawl_threshold();
        if crawl_threshold != 0 {
            self.crawl_threshold = crawl_threshold;
        } else {
            warn!(
                "Calibration interrupted - keeping crawl threshold {}",
                self.crawl_threshold
            );
        }

        end
    }

    /// フォロワーも停止させる（ベストエフォート）
    async fn publish_stop(&self) {
        if let Some(radio) = self.radio {
            let data = encode_packet(&SyncPacket::duty(0, Status::Ready));
            if let Err(e) = radio.broadcast(Some(&data)).await {
                warn!("Failed to notify follower of stop: {:?}", e);
            }
        }
    }
}
