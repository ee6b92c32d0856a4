//! 生存確認タスク
//!
//! リモコンの識別情報を定期的に読み出し、失敗したら接続フラグを下ろして終了します。
//! このタスクの終了でタスクグループ全体が破棄され、スーパーバイザーが再接続します。

use embassy_time::Timer;

use super::TaskContext;
use crate::fmt::*;
use crate::hal::{Hub, Motor, Radio, Remote};
use crate::state::SessionEnd;

pub async fn liveness_task<R, H, B, M>(ctx: &TaskContext<'_, R, H, B, M>) -> SessionEnd
where
    R: Remote,
    H: Hub,
    B: Radio,
    M: Motor,
{
    debug!(
        "Liveness probe started: period={}ms",
        ctx.config.probe_period.as_millis()
    );

    loop {
        if let Err(e) = ctx.remote.probe() {
            warn!("Remote link lost: {:?}", e);
            ctx.session.set_connected(false);
            return SessionEnd::LinkLost;
        }
        Timer::after(ctx.config.probe_period).await;
    }
}
