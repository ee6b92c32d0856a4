//! モータードライバー抽象化レイヤー
//!
//! ハブのポートA/Bに接続された最大2台のモーターをまとめ、
//! 回転方向を反映したデューティ比を一括で出力します。

use crate::hal::Motor;

/// モーターの回転方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Clockwise,
    Counterclockwise,
}

impl Direction {
    /// 1 → 時計回り、それ以外 → 反時計回り
    pub const fn from_sign(sign: i8) -> Self {
        if sign >= 0 {
            Direction::Clockwise
        } else {
            Direction::Counterclockwise
        }
    }

    /// 方向を反映したデューティ比
    pub const fn apply(self, duty: i16) -> i16 {
        match self {
            Direction::Clockwise => duty,
            Direction::Counterclockwise => -duty,
        }
    }
}

/// 1チャネル分のモーターと回転方向
struct MotorChannel<M> {
    motor: M,
    direction: Direction,
}

/// 2チャネルのモータードライバー
///
/// 片方のポートが空（モーター1台の車両）でも動作します。
pub struct MotorPair<M> {
    channels: [Option<MotorChannel<M>>; 2],
}

impl<M: Motor> MotorPair<M> {
    /// 新しいモータードライバーを作成
    ///
    /// # 引数
    /// * `motor_a` - ポートAのモーター（なければ `None`）
    /// * `motor_b` - ポートBのモーター（なければ `None`）
    /// * `directions` - A/Bの回転方向
    pub fn new(motor_a: Option<M>, motor_b: Option<M>, directions: [Direction; 2]) -> Self {
        Self {
            channels: [
                motor_a.map(|motor| MotorChannel {
                    motor,
                    direction: directions[0],
                }),
                motor_b.map(|motor| MotorChannel {
                    motor,
                    direction: directions[1],
                }),
            ],
        }
    }

    /// 全チャネルにデューティ比を出力
    ///
    /// 同じ値を繰り返し出力しても安全です（冪等）。
    pub fn apply(&self, duty: i16) {
        for channel in self.channels.iter().flatten() {
            channel.motor.set_duty(channel.direction.apply(duty));
        }
    }

    /// 全チャネルを停止
    pub fn stop(&self) {
        self.apply(0);
    }

    /// 接続されているモーター数
    pub fn channel_count(&self) -> usize {
        self.channels.iter().flatten().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimMotor;

    #[test]
    fn test_direction_sign() {
        assert_eq!(Direction::from_sign(1).apply(30), 30);
        assert_eq!(Direction::from_sign(-1).apply(30), -30);
    }

    #[test]
    fn test_apply_respects_direction() {
        let a = SimMotor::new("A");
        let b = SimMotor::new("B");
        let pair = MotorPair::new(
            Some(a.clone()),
            Some(b.clone()),
            [Direction::Counterclockwise, Direction::Clockwise],
        );

        pair.apply(40);
        assert_eq!(a.last(), Some(-40));
        assert_eq!(b.last(), Some(40));
    }

    #[test]
    fn test_single_motor_vehicle() {
        let b = SimMotor::new("B");
        let pair = MotorPair::new(None, Some(b.clone()), [Direction::Clockwise; 2]);

        assert_eq!(pair.channel_count(), 1);
        pair.apply(20);
        pair.stop();
        assert_eq!(b.writes(), vec![20, 0]);
    }
}
