//! コントローラタスク
//!
//! リモコンのボタンを50msごとに読み取り、クリック数とステータスを更新します。
//! 同時押しは +、-、停止、センターの順に優先します。
//! - +/-: クリック数を増減（0になったら停止）
//! - 停止: クリック数を0にして停止、長押しでキャリブレーション
//! - センター: 停止してプログラム終了、長押しで電源オフ

use embassy_time::Timer;

use super::calibration::calibrate;
use super::shutdown::power_down;
use super::TaskContext;
use crate::fmt::*;
use crate::hal::{Buttons, Hub, Motor, Radio, Remote};
use crate::state::{SessionEnd, Status};

pub async fn controller_task<R, H, B, M>(ctx: &TaskContext<'_, R, H, B, M>) -> SessionEnd
where
    R: Remote,
    H: Hub,
    B: Radio,
    M: Motor,
{
    info!("Controller task started");

    loop {
        let buttons = read_buttons(ctx).await;

        if !buttons.is_empty() {
            ctx.session.heartbeat().reset();

            if buttons.intersects(Buttons::PLUS | Buttons::MINUS) {
                let delta = if buttons.contains(Buttons::PLUS) { 1 } else { -1 };
                let clicks = ctx.session.step_clicks(delta);
                if clicks == 0 {
                    stop(ctx).await;
                } else {
                    go(ctx, clicks).await;
                }
            } else if buttons.contains(Buttons::STOP) {
                ctx.session.set_clicks(0);
                stop(ctx).await;
            } else if buttons.contains(Buttons::CENTER) {
                return center(ctx).await;
            }
        }

        Timer::after(ctx.config.poll_period).await;
    }
}

/// ボタンを読み取る
///
/// 読み取り失敗は一時的なものとして扱い、待機後に「何も押されていない」を返します。
/// 切断の検出は生存確認タスクが行います。
pub(crate) async fn read_buttons<R, H, B, M>(ctx: &TaskContext<'_, R, H, B, M>) -> Buttons
where
    R: Remote,
    H: Hub,
    B: Radio,
    M: Motor,
{
    match ctx.remote.pressed() {
        Ok(buttons) => buttons,
        Err(e) => {
            warn!("Remote read failed: {:?}, backing off", e);
            Timer::after(ctx.config.input_backoff).await;
            Buttons::empty()
        }
    }
}

/// クリック数に応じたステータスを表示し、連続入力を間引く
pub(crate) async fn go<R, H, B, M>(ctx: &TaskContext<'_, R, H, B, M>, clicks: i16)
where
    R: Remote,
    H: Hub,
    B: Radio,
    M: Motor,
{
    debug!("Go: clicks={}", clicks);
    ctx.indicator().show(Status::for_clicks(clicks)).await;
    Timer::after(ctx.config.button_delay()).await;
}

/// 停止処理
///
/// ブレーキ時間だけ STOP を表示してから READY に戻します。
/// その後も停止ボタンが押され続けていればキャリブレーションに入ります。
pub(crate) async fn stop<R, H, B, M>(ctx: &TaskContext<'_, R, H, B, M>)
where
    R: Remote,
    H: Hub,
    B: Radio,
    M: Motor,
{
    info!("Stop");
    let indicator = ctx.indicator();
    indicator.show(Status::Stop).await;
    Timer::after(ctx.config.brake()).await;
    indicator.show(Status::Ready).await;

    let mut held: u8 = 0;
    while read_buttons(ctx).await.contains(Buttons::STOP) {
        held += 1;
        if held >= ctx.config.stop_hold_polls {
            calibrate(ctx).await;
            // 確定時の停止ボタンが離されるまで新しい入力として扱わない
            while read_buttons(ctx).await.contains(Buttons::STOP) {
                Timer::after(ctx.config.hold_poll).await;
            }
            return;
        }
        Timer::after(ctx.config.hold_poll).await;
    }
}

/// センターボタン処理
async fn center<R, H, B, M>(ctx: &TaskContext<'_, R, H, B, M>) -> SessionEnd
where
    R: Remote,
    H: Hub,
    B: Radio,
    M: Motor,
{
    ctx.session.set_clicks(0);
    stop(ctx).await;

    let mut held: u8 = 0;
    while read_buttons(ctx).await.contains(Buttons::CENTER) {
        held += 1;
        if held >= ctx.config.center_hold_polls {
            info!("Center button held - powering off");
            ctx.indicator().show(Status::Stop).await;
            power_down(ctx.hub, ctx.radio, ctx.gate, ctx.config.sentinel_hold).await;
            return SessionEnd::PowerOff;
        }
        Timer::after(ctx.config.hold_poll).await;
    }

    info!("Center button released - closing program");
    SessionEnd::CloseProgram
}
