//! 無操作監視カウンタ
//!
//! 1周期（通常1分）ごとに `tick` を呼び、停車したまま規定回数経過したら
//! シャットダウンを要求します。ボタン操作やモーター出力の変化で `reset` されます。

use core::cell::Cell;

pub struct Heartbeat {
    beats: Cell<u16>,
    limit: u16,
}

impl Heartbeat {
    /// # Arguments
    /// * `limit` - シャットダウンまでの周期数（1以上）
    pub const fn new(limit: u16) -> Self {
        Self {
            beats: Cell::new(0),
            limit,
        }
    }

    /// 1周期分進める
    ///
    /// # Returns
    /// 無操作の上限に達した場合 `true`
    pub fn tick(&self, moving: bool) -> bool {
        if moving {
            self.beats.set(0);
            return false;
        }

        let beats = self.beats.get().saturating_add(1);
        self.beats.set(beats);
        beats >= self.limit
    }

    pub fn reset(&self) {
        self.beats.set(0);
    }

    pub fn beats(&self) -> u16 {
        self.beats.get()
    }

    pub fn limit(&self) -> u16 {
        self.limit
    }
}
