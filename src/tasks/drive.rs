//! ドライブタスク
//!
//! `accel_response × 10ms` ごとに実デューティ比を目標値へ近づけ、モーターに出力します。

use embassy_time::Ticker;

use super::TaskContext;
use crate::drive::DriveConvergence;
use crate::fmt::*;
use crate::hal::{Hub, Motor, Radio, Remote};
use crate::state::SessionEnd;

pub async fn drive_task<R, H, B, M>(ctx: &TaskContext<'_, R, H, B, M>) -> SessionEnd
where
    R: Remote,
    H: Hub,
    B: Radio,
    M: Motor,
{
    let config = ctx.config;
    let session = ctx.session;
    let convergence =
        DriveConvergence::new(config.smooth_accel, config.smooth_decel, config.reverse_max);

    info!(
        "Drive task started: period={}ms, smooth accel/decel={}/{}",
        config.drive_period().as_millis(),
        config.smooth_accel,
        config.smooth_decel
    );

    ctx.motors.apply(session.duty());
    let mut ticker = Ticker::every(config.drive_period());

    loop {
        ticker.next().await;

        let target = session.target();
        let duty = session.duty();
        if target != duty {
            let step = convergence.step(target, duty, session.crawl_threshold());
            session.set_duty(step.duty);

            if step.windup {
                let clicks = session.step_clicks(1);
                warn!(
                    "Reverse limit {}% reached - clicks held at {}",
                    config.reverse_max,
                    clicks
                );
            }

            debug!(
                "dc target={} actual={} cc={}",
                target,
                step.duty,
                session.clicks()
            );
        }

        // 同じ値の再出力は無害
        ctx.motors.apply(session.duty());
    }
}
