//! 電源オフ処理
//!
//! ブロードキャストが有効な場合は、先にフォロワーへシャットダウン通知を送ります。

use embassy_time::{Duration, Timer};

use crate::config::broadcast::{SENTINEL_ATTEMPTS, SENTINEL_RETRY_MS};
use crate::fmt::*;
use crate::hal::{Hub, Radio};
use crate::indicator::TransportGate;
use crate::sync_protocol::{encode_packet, SyncPacket};

/// フォロワーに通知してからハブの電源を切る
///
/// 通知中は送信ゲートを保持し、他の送信で上書きされないようにします。
///
/// # Arguments
/// * `radio` - ブロードキャスト無効時は `None`
/// * `hold` - 通知後、フォロワーが受信するまで待つ時間
pub async fn power_down<H: Hub, B: Radio>(
    hub: &H,
    radio: Option<&B>,
    gate: &TransportGate,
    hold: Duration,
) {
    if let Some(radio) = radio {
        let _transmit = gate.lock().await;
        let data = encode_packet(&SyncPacket::shutdown());

        for attempt in 1..=SENTINEL_ATTEMPTS {
            match radio.broadcast(Some(&data)).await {
                Ok(()) => {
                    info!("Shutdown sent to follower");
                    break;
                }
                Err(e) => {
                    warn!("Shutdown broadcast attempt {} failed: {:?}", attempt, e);
                    Timer::after(Duration::from_millis(SENTINEL_RETRY_MS)).await;
                }
            }
        }

        Timer::after(hold).await;
    }

    info!("Powering off hub");
    hub.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::transport_gate;
    use crate::sim::{SimHub, SimRadio};
    use embassy_futures::block_on;

    #[test]
    fn test_sentinel_retried_before_shutdown() {
        let hub = SimHub::new();
        let radio = SimRadio::new();
        radio.fail_next_sends(2);
        let gate = transport_gate();

        block_on(power_down(&hub, Some(&radio), &gate, Duration::from_millis(1)));

        assert_eq!(radio.sent(), vec![encode_packet(&SyncPacket::shutdown()).to_vec()]);
        assert_eq!(hub.shutdown_count(), 1);
    }

    #[test]
    fn test_shutdown_without_radio() {
        let hub = SimHub::new();
        let gate = transport_gate();

        block_on(power_down(&hub, None::<&SimRadio>, &gate, Duration::from_millis(1)));

        assert_eq!(hub.shutdown_count(), 1);
    }

    #[test]
    fn test_shutdown_even_if_sentinel_never_sent() {
        let hub = SimHub::new();
        let radio = SimRadio::new();
        radio.fail_next_sends(10);
        let gate = transport_gate();

        block_on(power_down(&hub, Some(&radio), &gate, Duration::from_millis(1)));

        assert!(radio.sent().is_empty());
        assert_eq!(hub.shutdown_count(), 1);
    }
}
