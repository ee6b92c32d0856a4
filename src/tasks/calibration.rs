//! キャリブレーション実行
//!
//! クローリング速度を一時的に0にし、恒等ランプ（クリック数 = デューティ比）で
//! 試行値をそのままモーターに出力します。確定した値は保存し、通常ランプを再構築します。

use embassy_time::Timer;

use super::controller::{go, read_buttons};
use super::TaskContext;
use crate::calibration::{CalibrationEvent, CrawlCalibration};
use crate::config::write_crawl_threshold;
use crate::drive::RampMode;
use crate::fmt::*;
use crate::hal::{Hub, Motor, Radio, Remote};
use crate::state::Status;

pub(crate) async fn calibrate<R, H, B, M>(ctx: &TaskContext<'_, R, H, B, M>)
where
    R: Remote,
    H: Hub,
    B: Radio,
    M: Motor,
{
    let session = ctx.session;
    info!(
        "Calibration started (crawl threshold was {})",
        session.crawl_threshold()
    );

    session.set_crawl_threshold(0);
    session.rebuild_ramp(RampMode::Calibrate);
    session.set_clicks(0);
    ctx.indicator().show(Status::Calibrate).await;

    let mut calibration = CrawlCalibration::new();

    // 確定するまでクローリング速度は0のまま
    while session.crawl_threshold() == 0 {
        Timer::after(ctx.config.calibrate_poll).await;

        let buttons = read_buttons(ctx).await;
        if !buttons.is_empty() {
            session.heartbeat().reset();
        }

        match calibration.handle(buttons) {
            CalibrationEvent::Trial(trial) => {
                info!("Calibration trial dc={}", trial);
                session.set_clicks(trial as i16);
            }
            CalibrationEvent::Commit(crawl_threshold) => {
                info!("Calibration committed: crawl threshold {}", crawl_threshold);
                session.set_crawl_threshold(crawl_threshold);
                if let Err(e) = write_crawl_threshold(ctx.hub, crawl_threshold) {
                    error!("Failed to store crawl threshold: {:?}", e);
                }
                session.rebuild_ramp(RampMode::Run);
                session.set_clicks(1);
                go(ctx, 1).await;
            }
            CalibrationEvent::None => {}
        }
    }
}
