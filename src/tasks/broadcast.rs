//! ブロードキャストタスク
//!
//! (デューティ比, ステータス) が変化したら1周期に1回だけ送信します。
//! 送信失敗は破棄し、次の周期で最新値を送り直します（再送キューなし）。
//! 値が変化しないまま数周期経過したら送信を停止して省電力化します。

use embassy_time::Ticker;

use super::TaskContext;
use crate::config::broadcast::CLOSE_AFTER_TICKS;
use crate::fmt::*;
use crate::hal::{Hub, Motor, Radio, Remote};
use crate::state::{SessionEnd, Status};
use crate::sync_protocol::{encode_packet, SyncPacket};

pub async fn broadcast_task<R, H, B, M>(ctx: &TaskContext<'_, R, H, B, M>, radio: &B) -> SessionEnd
where
    R: Remote,
    H: Hub,
    B: Radio,
    M: Motor,
{
    info!(
        "Broadcast task started: channel={:?}",
        ctx.config.broadcast_channel
    );

    let mut ticker = Ticker::every(ctx.config.broadcast_period);
    let mut published: Option<(i16, Status)> = None;
    let mut idle_ticks: u8 = 0;
    let mut advertising = false;

    loop {
        ticker.next().await;

        let current = (ctx.session.duty(), ctx.session.status());

        if published != Some(current) {
            let data = encode_packet(&SyncPacket::duty(current.0, current.1));
            let result = {
                let _transmit = ctx.gate.lock().await;
                radio.broadcast(Some(&data)).await
            };

            match result {
                Ok(()) => {
                    trace!("Broadcast dc={} status={:?}", current.0, current.1);
                    published = Some(current);
                    advertising = true;
                    idle_ticks = 0;
                }
                Err(e) => warn!("Broadcast failed: {:?} - dropped", e),
            }
        } else if advertising {
            idle_ticks = idle_ticks.saturating_add(1);
            if idle_ticks >= CLOSE_AFTER_TICKS {
                let result = {
                    let _transmit = ctx.gate.lock().await;
                    radio.broadcast(None).await
                };

                match result {
                    Ok(()) => {
                        debug!("Broadcast idle - advertising stopped");
                        advertising = false;
                    }
                    Err(e) => warn!("Failed to stop advertising: {:?}", e),
                }
            }
        }
    }
}
