//! ホスト実行用のシミュレーションハードウェア
//!
//! テストと `train-sim` バイナリで使います。すべての動作は呼び出し回数で決まり、
//! 経過時間には依存しません。各ハンドルは `Clone` で同じ実体を共有するため、
//! 制御側に渡した後も記録を確認できます。

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::pending;
use std::rc::Rc;

use crate::hal::{
    Buttons, Hub, LinkError, Motor, Radio, RadioError, Remote, RemoteConnector, StorageError,
};
use crate::state::Status;

/// リモコンのボタン読み取り1回分の動作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStep {
    /// このボタンが押されている
    Buttons(Buttons),
    /// 一時的な読み取り失敗（接続は維持）
    ReadError,
    /// 接続が切れる（以降の読み取り・生存確認はすべて失敗）
    DropLink,
}

struct RemoteInner {
    script: RefCell<VecDeque<RemoteStep>>,
    linked: Cell<bool>,
    lights: RefCell<Vec<Status>>,
    fail_lights: Cell<bool>,
}

/// スクリプト駆動のリモコン
///
/// スクリプトを使い切った後は「何も押されていない」を返し続けます。
#[derive(Clone)]
pub struct SimRemote {
    inner: Rc<RemoteInner>,
}

impl SimRemote {
    pub fn new(script: Vec<RemoteStep>) -> Self {
        Self {
            inner: Rc::new(RemoteInner {
                script: RefCell::new(script.into()),
                linked: Cell::new(true),
                lights: RefCell::new(Vec::new()),
                fail_lights: Cell::new(false),
            }),
        }
    }

    /// 表示されたステータスの履歴
    pub fn lights(&self) -> Vec<Status> {
        self.inner.lights.borrow().clone()
    }

    pub fn is_linked(&self) -> bool {
        self.inner.linked.get()
    }

    /// ライト更新を失敗させる
    pub fn fail_lights(&self, fail: bool) {
        self.inner.fail_lights.set(fail);
    }
}

impl Remote for SimRemote {
    fn pressed(&self) -> Result<Buttons, LinkError> {
        if !self.inner.linked.get() {
            return Err(LinkError::Disconnected);
        }

        match self.inner.script.borrow_mut().pop_front() {
            Some(RemoteStep::Buttons(buttons)) => Ok(buttons),
            Some(RemoteStep::ReadError) => Err(LinkError::Io),
            Some(RemoteStep::DropLink) => {
                self.inner.linked.set(false);
                Err(LinkError::Disconnected)
            }
            None => Ok(Buttons::empty()),
        }
    }

    fn probe(&self) -> Result<(), LinkError> {
        if self.inner.linked.get() {
            Ok(())
        } else {
            Err(LinkError::Disconnected)
        }
    }

    async fn set_light(&self, status: Status) -> Result<(), LinkError> {
        if !self.inner.linked.get() {
            return Err(LinkError::Disconnected);
        }
        if self.inner.fail_lights.get() {
            return Err(LinkError::Io);
        }
        self.inner.lights.borrow_mut().push(status);
        Ok(())
    }
}

/// 用意したリモコンを順番に返す接続処理
///
/// 用意したリモコンがなくなると、見つからないまま待ち続けます。
pub struct SimConnector {
    remotes: VecDeque<SimRemote>,
    attempts: usize,
}

impl SimConnector {
    pub fn new(remotes: Vec<SimRemote>) -> Self {
        Self {
            remotes: remotes.into(),
            attempts: 0,
        }
    }

    /// 接続試行回数
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl RemoteConnector for SimConnector {
    type Remote = SimRemote;

    async fn connect(&mut self) -> Result<SimRemote, LinkError> {
        self.attempts += 1;
        match self.remotes.pop_front() {
            Some(remote) => Ok(remote),
            None => pending().await,
        }
    }
}

/// 出力値を記録するモーター
#[derive(Clone)]
pub struct SimMotor {
    name: &'static str,
    writes: Rc<RefCell<Vec<i16>>>,
}

impl SimMotor {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            writes: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 出力されたデューティ比の履歴
    ///
    /// ドライブは毎周期同じ値を出力し直すため、意図的に連続する同じ値を1つにまとめて記録します。
    /// 出力回数ではなく値の変化を確認するためのものです。
    pub fn writes(&self) -> Vec<i16> {
        self.writes.borrow().clone()
    }

    pub fn last(&self) -> Option<i16> {
        self.writes.borrow().last().copied()
    }
}

impl Motor for SimMotor {
    fn set_duty(&self, duty: i16) {
        let mut writes = self.writes.borrow_mut();
        if writes.last() != Some(&duty) {
            writes.push(duty);
        }
    }
}

/// ユーザーストレージ容量 [byte]
pub const STORAGE_LEN: usize = 64;

struct HubInner {
    storage: RefCell<[u8; STORAGE_LEN]>,
    fail_storage: Cell<bool>,
    lights: RefCell<Vec<Status>>,
    shutdowns: Cell<usize>,
}

/// ハブ本体
#[derive(Clone)]
pub struct SimHub {
    inner: Rc<HubInner>,
}

impl SimHub {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(HubInner {
                storage: RefCell::new([0; STORAGE_LEN]),
                fail_storage: Cell::new(false),
                lights: RefCell::new(Vec::new()),
                shutdowns: Cell::new(0),
            }),
        }
    }

    /// ストレージの先頭に `data` が書かれた状態で作成
    pub fn with_storage(data: &[u8]) -> Self {
        let hub = Self::new();
        let len = data.len().min(STORAGE_LEN);
        hub.inner.storage.borrow_mut()[..len].copy_from_slice(&data[..len]);
        hub
    }

    pub fn storage(&self) -> Vec<u8> {
        self.inner.storage.borrow().to_vec()
    }

    /// ストレージの読み書きを失敗させる
    pub fn fail_storage(&self, fail: bool) {
        self.inner.fail_storage.set(fail);
    }

    pub fn lights(&self) -> Vec<Status> {
        self.inner.lights.borrow().clone()
    }

    pub fn shutdown_count(&self) -> usize {
        self.inner.shutdowns.get()
    }
}

impl Default for SimHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub for SimHub {
    fn read_storage(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        if self.inner.fail_storage.get() {
            return Err(StorageError::ReadFailed);
        }
        let storage = self.inner.storage.borrow();
        let data = storage
            .get(offset..offset + buf.len())
            .ok_or(StorageError::OutOfRange)?;
        buf.copy_from_slice(data);
        Ok(())
    }

    fn write_storage(&self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        if self.inner.fail_storage.get() {
            return Err(StorageError::WriteFailed);
        }
        let mut storage = self.inner.storage.borrow_mut();
        storage
            .get_mut(offset..offset + data.len())
            .ok_or(StorageError::OutOfRange)?
            .copy_from_slice(data);
        Ok(())
    }

    fn set_light(&self, status: Status) {
        self.inner.lights.borrow_mut().push(status);
    }

    fn shutdown(&self) {
        self.inner.shutdowns.set(self.inner.shutdowns.get() + 1);
    }
}

struct RadioInner {
    air: RefCell<Option<Vec<u8>>>,
    sent: RefCell<Vec<Vec<u8>>>,
    closes: Cell<usize>,
    fail_sends: Cell<usize>,
}

/// 近距離ブロードキャスト
///
/// クローンしたハンドル同士は同じ「空中」を共有するため、リーダーとフォロワーに
/// それぞれ渡すとループバック通信になります。受信側は最後に送信された値を何度でも読めます。
#[derive(Clone)]
pub struct SimRadio {
    inner: Rc<RadioInner>,
}

impl SimRadio {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RadioInner {
                air: RefCell::new(None),
                sent: RefCell::new(Vec::new()),
                closes: Cell::new(0),
                fail_sends: Cell::new(0),
            }),
        }
    }

    /// 送信に成功したデータの履歴
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.inner.sent.borrow().clone()
    }

    /// 送信停止の回数
    pub fn close_count(&self) -> usize {
        self.inner.closes.get()
    }

    /// 現在送信中のデータ
    pub fn air(&self) -> Option<Vec<u8>> {
        self.inner.air.borrow().clone()
    }

    /// 他のハブからの送信を模擬
    pub fn set_air(&self, data: &[u8]) {
        *self.inner.air.borrow_mut() = Some(data.to_vec());
    }

    pub fn clear_air(&self) {
        *self.inner.air.borrow_mut() = None;
    }

    /// 次の `count` 回の送信を失敗させる
    pub fn fail_next_sends(&self, count: usize) {
        self.inner.fail_sends.set(count);
    }
}

impl Default for SimRadio {
    fn default() -> Self {
        Self::new()
    }
}

impl Radio for SimRadio {
    async fn broadcast(&self, data: Option<&[u8]>) -> Result<(), RadioError> {
        let failures = self.inner.fail_sends.get();
        if failures > 0 {
            self.inner.fail_sends.set(failures - 1);
            return Err(RadioError::SendFailed);
        }

        match data {
            Some(data) => {
                self.inner.sent.borrow_mut().push(data.to_vec());
                *self.inner.air.borrow_mut() = Some(data.to_vec());
            }
            None => {
                self.inner.closes.set(self.inner.closes.get() + 1);
                *self.inner.air.borrow_mut() = None;
            }
        }
        Ok(())
    }

    fn observe(&self, buf: &mut [u8]) -> Result<Option<usize>, RadioError> {
        match self.inner.air.borrow().as_deref() {
            Some(data) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(Some(len))
            }
            None => Ok(None),
        }
    }
}
