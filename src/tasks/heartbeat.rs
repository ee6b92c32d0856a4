//! ハートビートタスク
//!
//! 停車したまま一定時間操作がなければ電源を切ります（電池の消耗防止）。

use embassy_time::{Duration, Ticker};

use super::shutdown::power_down;
use super::TaskContext;
use crate::fmt::*;
use crate::hal::{Hub, Motor, Radio, Remote};
use crate::heartbeat::Heartbeat;
use crate::state::{SessionEnd, Status};

/// 無操作の上限に達するまで待機
///
/// `moving` が `true` を返す周期ではカウンタがリセットされます。
pub(crate) async fn wait_for_inactivity(
    heartbeat: &Heartbeat,
    period: Duration,
    moving: impl Fn() -> bool,
) {
    let mut ticker = Ticker::every(period);

    loop {
        ticker.next().await;
        if heartbeat.tick(moving()) {
            return;
        }
        debug!("Heartbeat {}/{}", heartbeat.beats(), heartbeat.limit());
    }
}

pub async fn heartbeat_task<R, H, B, M>(ctx: &TaskContext<'_, R, H, B, M>) -> SessionEnd
where
    R: Remote,
    H: Hub,
    B: Radio,
    M: Motor,
{
    info!(
        "Heartbeat task started: shutdown after {} idle periods",
        ctx.config.inactivity_minutes
    );

    wait_for_inactivity(ctx.session.heartbeat(), ctx.config.heartbeat_period, || {
        ctx.session.duty() != 0
    })
    .await;

    info!("No activity - powering off");
    ctx.indicator().show(Status::Stop).await;
    power_down(ctx.hub, ctx.radio, ctx.gate, ctx.config.sentinel_hold).await;
    SessionEnd::PowerOff
}
