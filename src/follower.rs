//! フォロワーハブ（リモコンなし、モーターのみ）
//!
//! リーダーハブのブロードキャストを受信し、デューティ比とステータスを
//! 自分のモーターとライトに反映します。シャットダウン通知を受信するか、
//! 一定時間操作がなければ電源を切ります。

use core::cell::Cell;

use embassy_futures::select::select3;
use embassy_time::{Ticker, Timer};

use crate::config::FollowerConfig;
use crate::fmt::*;
use crate::hal::{Hub, Motor, Radio};
use crate::heartbeat::Heartbeat;
use crate::motor::MotorPair;
use crate::state::{SessionEnd, Status};
use crate::sync_protocol::{parse_packet, SyncDuty, SyncPacket, PACKET_LEN};
use crate::tasks::heartbeat::wait_for_inactivity;

/// 受信データの許容範囲
const DUTY_RANGE: core::ops::RangeInclusive<i16> = -100..=100;
const STATUS_RANGE: core::ops::RangeInclusive<i16> = 0..=100;

/// 検証済みの受信内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FollowerCommand {
    Apply { duty: i16, status: Status },
    Shutdown,
}

/// 受信パケットの範囲チェック
///
/// 範囲外のデューティ比・ステータスは0に置き換え、警告を出力します。
/// ステータスコード0～100のうち未定義の値は READY として扱います。
pub fn validate(packet: &SyncPacket) -> FollowerCommand {
    let duty = match packet.duty {
        SyncDuty::Shutdown => return FollowerCommand::Shutdown,
        SyncDuty::Duty(duty) if DUTY_RANGE.contains(&duty) => duty,
        SyncDuty::Duty(duty) => {
            warn!("Received dc {} out of range - using 0", duty);
            0
        }
    };

    let code = if STATUS_RANGE.contains(&packet.status) {
        packet.status as u8
    } else {
        warn!("Received status {} out of range - using 0", packet.status);
        0
    };

    FollowerCommand::Apply {
        duty,
        status: Status::from_code(code).unwrap_or(Status::Ready),
    }
}

/// 受信タスクとドライブタスクで共有する状態
struct FollowerState {
    duty: Cell<i16>,
    status: Cell<Status>,
    heartbeat: Heartbeat,
}

/// フォロワーを実行し、電源オフで終了
///
/// 受信・ドライブ・ハートビートのいずれかが終了した時点で全体が終了します
/// （ドライブは終了しません）。
pub async fn run<H, B, M>(config: &FollowerConfig, hub: &H, radio: &B, motors: &MotorPair<M>) -> SessionEnd
where
    H: Hub,
    B: Radio,
    M: Motor,
{
    info!(
        "Follower started: observing channel {}, {} motor(s)",
        config.observe_channel,
        motors.channel_count()
    );

    let state = FollowerState {
        duty: Cell::new(0),
        status: Cell::new(Status::Ready),
        heartbeat: Heartbeat::new(config.inactivity_minutes),
    };

    motors.stop();
    hub.set_light(Status::Ready);

    select3(
        listen(config, hub, radio, &state),
        drive(config, hub, motors, &state),
        async {
            wait_for_inactivity(&state.heartbeat, config.heartbeat_period, || {
                state.duty.get() != 0
            })
            .await;
            info!("Follower idle - powering off");
            hub.shutdown();
        },
    )
    .await;

    SessionEnd::PowerOff
}

/// 最新の受信パケットを読み取り、シャットダウン通知で終了
async fn listen<H: Hub, B: Radio>(config: &FollowerConfig, hub: &H, radio: &B, state: &FollowerState) {
    let mut buf = [0u8; PACKET_LEN];

    loop {
        match radio.observe(&mut buf) {
            Ok(Some(len)) => {
                if let Some(packet) = parse_packet(&buf[..len]) {
                    match validate(&packet) {
                        FollowerCommand::Apply { duty, status } => {
                            state.duty.set(duty);
                            state.status.set(status);
                        }
                        FollowerCommand::Shutdown => {
                            info!("Shutdown received from leader");
                            hub.set_light(Status::Stop);
                            hub.shutdown();
                            return;
                        }
                    }
                }
            }
            // 受信なし：最後に適用した値を維持
            Ok(None) => {}
            Err(e) => warn!("Observe failed: {:?}", e),
        }

        Timer::after(config.listen_period).await;
    }
}

/// 変化したときだけモーターとライトを更新
async fn drive<H: Hub, M: Motor>(
    config: &FollowerConfig,
    hub: &H,
    motors: &MotorPair<M>,
    state: &FollowerState,
) {
    let mut applied_duty: i16 = 0;
    let mut applied_status = Status::Ready;
    let mut ticker = Ticker::every(config.drive_period);

    loop {
        ticker.next().await;

        let duty = state.duty.get();
        if duty != applied_duty {
            debug!("Follower dc {} -> {}", applied_duty, duty);
            motors.apply(duty);
            state.heartbeat.reset();
            applied_duty = duty;
        }

        let status = state.status.get();
        if status != applied_status {
            hub.set_light(status);
            applied_status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimHub, SimMotor, SimRadio};
    use crate::sync_protocol::encode_packet;
    use embassy_futures::block_on;
    use embassy_futures::join::join;
    use embassy_time::Duration;

    #[test]
    fn test_out_of_range_duty_is_zeroed() {
        let packet = SyncPacket {
            duty: SyncDuty::Duty(150),
            status: Status::Go4.code() as i16,
        };
        assert_eq!(
            validate(&packet),
            FollowerCommand::Apply {
                duty: 0,
                status: Status::Go4
            }
        );
    }

    #[test]
    fn test_out_of_range_status_is_zeroed() {
        let packet = SyncPacket {
            duty: SyncDuty::Duty(-20),
            status: -5,
        };
        match validate(&packet) {
            FollowerCommand::Apply { duty, status } => {
                assert_eq!(duty, -20);
                assert_eq!(status.code(), 0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_undefined_status_code_shows_ready() {
        let packet = SyncPacket {
            duty: SyncDuty::Duty(10),
            status: 55,
        };
        assert_eq!(
            validate(&packet),
            FollowerCommand::Apply {
                duty: 10,
                status: Status::Ready
            }
        );
    }

    #[test]
    fn test_mirrors_leader_then_shuts_down_once() {
        let config = FollowerConfig::fast();
        let hub = SimHub::new();
        let radio = SimRadio::new();
        let motor = SimMotor::new("A");
        let motors = MotorPair::new(Some(motor.clone()), None, config.directions());

        radio.set_air(&encode_packet(&SyncPacket::duty(30, Status::Go1)));
        let leader = async {
            Timer::after(Duration::from_millis(15)).await;
            radio.set_air(&encode_packet(&SyncPacket::shutdown()));
        };

        let (end, ()) = block_on(join(run(&config, &hub, &radio, &motors), leader));

        assert_eq!(end, SessionEnd::PowerOff);
        assert_eq!(hub.shutdown_count(), 1);
        assert_eq!(motor.writes(), vec![0, 30]);
        assert!(hub.lights().contains(&Status::Go1));
    }

    #[test]
    fn test_missing_packets_keep_last_value() {
        let config = FollowerConfig::fast();
        let hub = SimHub::new();
        let radio = SimRadio::new();
        let motor = SimMotor::new("A");
        let motors = MotorPair::new(Some(motor.clone()), None, config.directions());

        radio.set_air(&encode_packet(&SyncPacket::duty(-20, Status::Crawl)));
        let leader = async {
            Timer::after(Duration::from_millis(10)).await;
            radio.clear_air();
            Timer::after(Duration::from_millis(10)).await;
            radio.set_air(&encode_packet(&SyncPacket::shutdown()));
        };

        block_on(join(run(&config, &hub, &radio, &motors), leader));

        assert_eq!(motor.writes(), vec![0, -20]);
        assert_eq!(hub.shutdown_count(), 1);
    }

    #[test]
    fn test_idle_follower_powers_off() {
        let mut config = FollowerConfig::fast();
        config.inactivity_minutes = 2;
        let hub = SimHub::new();
        let radio = SimRadio::new();
        let motors = MotorPair::new(Some(SimMotor::new("A")), None, config.directions());

        assert_eq!(block_on(run(&config, &hub, &radio, &motors)), SessionEnd::PowerOff);
        assert_eq!(hub.shutdown_count(), 1);
    }
}
