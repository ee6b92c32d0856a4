//! 非同期タスク群
//!
//! 1回のリモコン接続につき、以下のタスクを同時に実行します。
//! - コントローラ: ボタン入力（停止・キャリブレーション・終了を含む）
//! - ドライブ: デューティ比の収束とモーター出力
//! - ハートビート: 無操作シャットダウン
//! - ブロードキャスト: フォロワーハブへの同期（チャネル設定時のみ）
//! - 生存確認: リモコン切断の検出
//!
//! 最初に終了したタスクの `SessionEnd` がグループの結果となり、残りのタスクはその時点で破棄されます。

pub mod broadcast;
pub mod calibration;
pub mod controller;
pub mod drive;
pub mod heartbeat;
pub mod liveness;
pub mod shutdown;

use core::future::pending;

use embassy_futures::select::{select, select4, Either, Either4};

use crate::config::DriverConfig;
use crate::hal::{Hub, Motor, Radio, Remote};
use crate::indicator::{Indicator, TransportGate};
use crate::motor::MotorPair;
use crate::state::{Session, SessionEnd};

/// タスクグループで共有する参照一式
pub struct TaskContext<'a, R, H, B, M> {
    pub config: &'a DriverConfig,
    pub session: &'a Session,
    pub remote: &'a R,
    pub hub: &'a H,
    /// ブロードキャスト用の無線（チャネル未設定なら `None`）
    pub radio: Option<&'a B>,
    pub motors: &'a MotorPair<M>,
    pub gate: &'a TransportGate,
}

impl<'a, R: Remote, H: Hub, B: Radio, M: Motor> TaskContext<'a, R, H, B, M> {
    pub fn indicator(&self) -> Indicator<'a, R, H> {
        Indicator::new(self.session, self.remote, self.hub, self.gate)
    }
}

/// タスクグループを実行し、最初に終了したタスクの結果を返す
pub async fn run_group<R, H, B, M>(ctx: &TaskContext<'_, R, H, B, M>) -> SessionEnd
where
    R: Remote,
    H: Hub,
    B: Radio,
    M: Motor,
{
    let broadcaster = async {
        match ctx.radio {
            Some(radio) => broadcast::broadcast_task(ctx, radio).await,
            None => pending().await,
        }
    };

    let result = select(
        select4(
            controller::controller_task(ctx),
            drive::drive_task(ctx),
            heartbeat::heartbeat_task(ctx),
            broadcaster,
        ),
        liveness::liveness_task(ctx),
    )
    .await;

    match result {
        Either::First(
            Either4::First(end) | Either4::Second(end) | Either4::Third(end) | Either4::Fourth(end),
        ) => end,
        Either::Second(end) => end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::Buttons;
    use crate::indicator::transport_gate;
    use crate::sim::{RemoteStep, SimHub, SimMotor, SimRadio, SimRemote};
    use crate::state::Status;
    use crate::sync_protocol::{encode_packet, SyncPacket};
    use embassy_futures::block_on;

    fn idle(count: usize) -> impl Iterator<Item = RemoteStep> {
        core::iter::repeat(RemoteStep::Buttons(Buttons::empty())).take(count)
    }

    #[test]
    fn test_plus_press_drives_motor_until_link_drop() {
        let config = DriverConfig::fast();
        let session = Session::new(&config, 25);
        let mut script = vec![RemoteStep::Buttons(Buttons::PLUS)];
        script.extend(idle(40));
        script.push(RemoteStep::DropLink);
        let remote = SimRemote::new(script);
        let hub = SimHub::new();
        let motor = SimMotor::new("A");
        let motors = MotorPair::new(Some(motor.clone()), None, config.directions());
        let gate = transport_gate();

        let ctx = TaskContext {
            config: &config,
            session: &session,
            remote: &remote,
            hub: &hub,
            radio: None::<&SimRadio>,
            motors: &motors,
            gate: &gate,
        };

        assert_eq!(block_on(run_group(&ctx)), SessionEnd::LinkLost);
        assert!(!session.is_connected());
        assert_eq!(session.clicks(), 1);
        assert_eq!(remote.lights().first(), Some(&Status::Crawl));
        // kickstart from standstill
        assert!(motor.writes().contains(&13));
        assert!(motor.writes().iter().all(|&duty| (0..=25).contains(&duty)));
    }

    #[test]
    fn test_reverse_blocked_winds_clicks_back() {
        let mut config = DriverConfig::fast();
        config.reverse_max = 0;
        let session = Session::new(&config, 25);
        let mut script = vec![RemoteStep::Buttons(Buttons::MINUS)];
        script.extend(idle(40));
        script.push(RemoteStep::DropLink);
        let remote = SimRemote::new(script);
        let hub = SimHub::new();
        let motor = SimMotor::new("A");
        let motors = MotorPair::new(Some(motor.clone()), None, config.directions());
        let gate = transport_gate();

        let ctx = TaskContext {
            config: &config,
            session: &session,
            remote: &remote,
            hub: &hub,
            radio: None::<&SimRadio>,
            motors: &motors,
            gate: &gate,
        };

        assert_eq!(block_on(run_group(&ctx)), SessionEnd::LinkLost);
        assert_eq!(session.clicks(), 0);
        assert_eq!(session.duty(), 0);
        assert!(motor.writes().iter().all(|&duty| duty == 0));
    }

    #[test]
    fn test_held_commit_press_keeps_crawl() {
        let config = DriverConfig::fast();
        let session = Session::new(&config, 25);
        let mut script: Vec<_> = core::iter::repeat(RemoteStep::Buttons(Buttons::STOP))
            .take(6)
            .collect();
        script.extend(core::iter::repeat(RemoteStep::Buttons(Buttons::PLUS)).take(3));
        // 確定の停止ボタンを複数周期押し続ける
        script.extend(core::iter::repeat(RemoteStep::Buttons(Buttons::STOP)).take(8));
        script.extend(idle(10));
        script.push(RemoteStep::DropLink);
        let remote = SimRemote::new(script);
        let hub = SimHub::new();
        let motors = MotorPair::new(Some(SimMotor::new("A")), None, config.directions());
        let gate = transport_gate();

        let ctx = TaskContext {
            config: &config,
            session: &session,
            remote: &remote,
            hub: &hub,
            radio: None::<&SimRadio>,
            motors: &motors,
            gate: &gate,
        };

        assert_eq!(block_on(run_group(&ctx)), SessionEnd::LinkLost);
        assert_eq!(session.crawl_threshold(), 3);
        assert_eq!(session.clicks(), 1);
        assert_eq!(session.status(), Status::Crawl);
        assert_eq!(
            remote.lights(),
            vec![Status::Stop, Status::Ready, Status::Calibrate, Status::Crawl]
        );
        assert_eq!(&hub.storage()[..4], b"dc03");
    }

    #[test]
    fn test_plus_wins_over_other_buttons_in_one_snapshot() {
        let config = DriverConfig::fast();
        let session = Session::new(&config, 25);
        let mut script = vec![RemoteStep::Buttons(Buttons::PLUS | Buttons::STOP | Buttons::CENTER)];
        script.push(RemoteStep::Buttons(Buttons::MINUS | Buttons::STOP));
        // 停止後の長押し判定で1回読まれる
        script.extend(idle(1));
        script.push(RemoteStep::Buttons(Buttons::MINUS | Buttons::CENTER));
        script.extend(idle(5));
        script.push(RemoteStep::DropLink);
        let remote = SimRemote::new(script);
        let hub = SimHub::new();
        let motors = MotorPair::new(Some(SimMotor::new("A")), None, config.directions());
        let gate = transport_gate();

        let ctx = TaskContext {
            config: &config,
            session: &session,
            remote: &remote,
            hub: &hub,
            radio: None::<&SimRadio>,
            motors: &motors,
            gate: &gate,
        };

        // センター・停止より +/- が優先され、プログラムは終了しない
        assert_eq!(block_on(run_group(&ctx)), SessionEnd::LinkLost);
        assert_eq!(session.clicks(), -1);
        assert_eq!(
            remote.lights(),
            vec![Status::Crawl, Status::Stop, Status::Ready, Status::Crawl]
        );
    }

    #[test]
    fn test_center_tap_closes_program() {
        let config = DriverConfig::fast();
        let session = Session::new(&config, 25);
        let remote = SimRemote::new(vec![
            RemoteStep::Buttons(Buttons::PLUS),
            RemoteStep::Buttons(Buttons::PLUS),
            RemoteStep::Buttons(Buttons::CENTER),
        ]);
        let hub = SimHub::new();
        let motors = MotorPair::new(Some(SimMotor::new("A")), None, config.directions());
        let gate = transport_gate();

        let ctx = TaskContext {
            config: &config,
            session: &session,
            remote: &remote,
            hub: &hub,
            radio: None::<&SimRadio>,
            motors: &motors,
            gate: &gate,
        };

        assert_eq!(block_on(run_group(&ctx)), SessionEnd::CloseProgram);
        assert_eq!(session.clicks(), 0);
        assert_eq!(session.status(), Status::Ready);
        assert_eq!(
            remote.lights(),
            vec![Status::Crawl, Status::Go1, Status::Stop, Status::Ready]
        );
        assert_eq!(hub.shutdown_count(), 0);
    }

    #[test]
    fn test_center_hold_powers_off_and_notifies_follower() {
        let config = DriverConfig::fast();
        let session = Session::new(&config, 25);
        let script = core::iter::repeat(RemoteStep::Buttons(Buttons::CENTER))
            .take(20)
            .collect();
        let remote = SimRemote::new(script);
        let hub = SimHub::new();
        let radio = SimRadio::new();
        let motors = MotorPair::new(Some(SimMotor::new("A")), None, config.directions());
        let gate = transport_gate();

        let ctx = TaskContext {
            config: &config,
            session: &session,
            remote: &remote,
            hub: &hub,
            radio: Some(&radio),
            motors: &motors,
            gate: &gate,
        };

        assert_eq!(block_on(run_group(&ctx)), SessionEnd::PowerOff);
        assert_eq!(hub.shutdown_count(), 1);
        assert_eq!(radio.air(), Some(encode_packet(&SyncPacket::shutdown()).to_vec()));
    }
}
