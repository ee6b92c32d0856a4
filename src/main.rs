//! 列車コントローラのホストシミュレーター
//!
//! リモコン・モーター・ハブ・無線をシミュレーションし、リーダーの制御プログラムと
//! ループバック接続したフォロワーを同じエグゼキュータ上で実行します。
//!
//! 使い方: `train-sim [SCRIPT]`
//!
//! SCRIPT はボタン読み取り1回ごとのトークン列です。
//! - `+` / `-` : 加速 / 減速
//! - `s` : 停止
//! - `c` : センター
//! - `.` : 何も押さない
//! - `!` : リモコン切断（以降は次のリモコンのスクリプト）
//! - 数字 `N` を直前のトークンの後に付けると N 回繰り返し（例: `.20`）

use anyhow::{bail, Context, Result};
use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use train_driver::config::{DriverConfig, FollowerConfig};
use train_driver::follower;
use train_driver::hal::Buttons;
use train_driver::motor::MotorPair;
use train_driver::sim::{RemoteStep, SimConnector, SimHub, SimMotor, SimRadio, SimRemote};
use train_driver::ReconnectSupervisor;

/// 既定のスクリプト: 発車・加速・減速・停止・切断・再接続後に長押しキャリブレーション・終了
const DEFAULT_SCRIPT: &str = "+.10+.10+.40-.10-.30s.20!+.20s6.3+8-s.30c.3";

/// リーダー終了後、フォロワーがシャットダウン通知を受け取るまでの猶予
const FOLLOWER_GRACE: Duration = Duration::from_millis(500);

/// スクリプト文字列を、リモコンごとのステップ列に分解
fn parse_script(script: &str) -> Result<Vec<Vec<RemoteStep>>> {
    let mut remotes = vec![Vec::new()];
    let mut chars = script.chars().peekable();

    while let Some(token) = chars.next() {
        let step = match token {
            '+' => RemoteStep::Buttons(Buttons::PLUS),
            '-' => RemoteStep::Buttons(Buttons::MINUS),
            's' => RemoteStep::Buttons(Buttons::STOP),
            'c' => RemoteStep::Buttons(Buttons::CENTER),
            '.' => RemoteStep::Buttons(Buttons::empty()),
            '!' => RemoteStep::DropLink,
            c if c.is_whitespace() => continue,
            other => bail!("unknown script token {:?}", other),
        };

        let mut digits = String::new();
        while let Some(&c) = chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            digits.push(c);
            chars.next();
        }
        let count = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<usize>()
                .with_context(|| format!("invalid repeat count {:?}", digits))?
        };

        if step == RemoteStep::DropLink {
            if count != 1 {
                bail!("'!' cannot be repeated");
            }
            if let Some(current) = remotes.last_mut() {
                current.push(step);
            }
            remotes.push(Vec::new());
            continue;
        }

        if let Some(current) = remotes.last_mut() {
            current.extend(std::iter::repeat(step).take(count));
        }
    }

    Ok(remotes)
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("train_driver=debug,info")),
        )
        .init();

    let script = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_SCRIPT.to_string());
    let remotes = match parse_script(&script) {
        Ok(remotes) => remotes,
        Err(e) => {
            error!("Invalid script: {:#}", e);
            std::process::exit(2);
        }
    };
    info!("Simulating {} remote connection(s)", remotes.len());

    let config = DriverConfig::default().sanitize();
    let follower_config = FollowerConfig::default().sanitize();

    let mut connector = SimConnector::new(remotes.into_iter().map(SimRemote::new).collect());
    let hub = SimHub::new();
    let radio = SimRadio::new();
    let motors = MotorPair::new(
        Some(SimMotor::new("A")),
        Some(SimMotor::new("B")),
        config.directions(),
    );

    let follower_hub = SimHub::new();
    let follower_radio = radio.clone();
    let follower_motors = MotorPair::new(
        Some(SimMotor::new("A")),
        None,
        follower_config.directions(),
    );

    let leader_done = Signal::<NoopRawMutex, ()>::new();

    let leader = async {
        let mut supervisor =
            ReconnectSupervisor::new(&config, &mut connector, &hub, Some(&radio), &motors);
        let result = supervisor.run().await;
        leader_done.signal(());
        result
    };

    let follower = select(
        follower::run(&follower_config, &follower_hub, &follower_radio, &follower_motors),
        async {
            leader_done.wait().await;
            Timer::after(FOLLOWER_GRACE).await;
        },
    );

    let (result, _) = join(leader, follower).await;

    info!(
        "Leader hub shutdowns: {}, follower hub shutdowns: {}",
        hub.shutdown_count(),
        follower_hub.shutdown_count()
    );

    match result {
        Ok(end) => {
            info!("Leader finished: {:?}", end);
            std::process::exit(0);
        }
        Err(e) => {
            error!("Leader failed: {:?}", e);
            std::process::exit(1);
        }
    }
}
