//! ステータス表示
//!
//! ステータスをセッションに記録し、ハブとリモコンの両方のライトに反映します。
//! リモコンのライト更新は無線送信を伴うため、ブロードキャストと同じ
//! 送信ゲートを取得してから行います（同時に1つの送信のみ）。

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;

use crate::fmt::*;
use crate::hal::{Hub, Remote};
use crate::state::{Session, Status};

/// 無線送信の排他ゲート
///
/// 単一エグゼキュータ上のタスク間でのみ共有するため `NoopRawMutex` を使います。
pub type TransportGate = Mutex<NoopRawMutex, ()>;

/// 新しい送信ゲートを作成
pub const fn transport_gate() -> TransportGate {
    Mutex::new(())
}

pub struct Indicator<'a, R, H> {
    session: &'a Session,
    remote: &'a R,
    hub: &'a H,
    gate: &'a TransportGate,
}

impl<'a, R: Remote, H: Hub> Indicator<'a, R, H> {
    pub fn new(session: &'a Session, remote: &'a R, hub: &'a H, gate: &'a TransportGate) -> Self {
        Self {
            session,
            remote,
            hub,
            gate,
        }
    }

    /// ステータスを表示
    ///
    /// リモコンのライト更新に失敗してもハブのライトは更新済みのため、警告のみ出力します。
    pub async fn show(&self, status: Status) {
        if self.session.status() != status {
            info!("Status: {:?} -> {:?}", self.session.status(), status);
        }
        self.session.set_status(status);
        self.hub.set_light(status);

        let _transmit = self.gate.lock().await;
        if let Err(e) = self.remote.set_light(status).await {
            warn!("Remote light update failed: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::sim::{SimHub, SimRemote};
    use embassy_futures::block_on;

    #[test]
    fn test_show_updates_session_and_both_lights() {
        let session = Session::new(&DriverConfig::fast(), 25);
        let remote = SimRemote::new(vec![]);
        let hub = SimHub::new();
        let gate = transport_gate();

        let indicator = Indicator::new(&session, &remote, &hub, &gate);
        block_on(indicator.show(Status::Go2));

        assert_eq!(session.status(), Status::Go2);
        assert_eq!(hub.lights(), vec![Status::Go2]);
        assert_eq!(remote.lights(), vec![Status::Go2]);
    }

    #[test]
    fn test_failed_remote_light_keeps_hub_light() {
        let session = Session::new(&DriverConfig::fast(), 25);
        let remote = SimRemote::new(vec![]);
        remote.fail_lights(true);
        let hub = SimHub::new();
        let gate = transport_gate();

        let indicator = Indicator::new(&session, &remote, &hub, &gate);
        block_on(indicator.show(Status::Stop));

        assert_eq!(session.status(), Status::Stop);
        assert_eq!(hub.lights(), vec![Status::Stop]);
        assert!(remote.lights().is_empty());
    }
}
