//! ハードウェア境界
//!
//! リモコン、モーター、ハブ本体（ストレージ・ライト・電源）、無線ブロードキャストを
//! トレイトとして抽象化します。ハブの検出やLED色の対応付けは実装側の責務です。
//!
//! すべてのメソッドは `&self` を取ります。タスクは単一スレッドの協調スケジューリングで
//! 同じハードウェアを共有するため、実装は内部可変性で状態を持ちます。

use bitflags::bitflags;

use crate::state::Status;

bitflags! {
    /// リモコンで押されているボタンのスナップショット
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Buttons: u8 {
        /// 加速（左 +）
        const PLUS = 0b0001;
        /// 減速（左 -）
        const MINUS = 0b0010;
        /// 停止（左 赤）
        const STOP = 0b0100;
        /// センター（プログラム終了 / 長押しで電源オフ）
        const CENTER = 0b1000;
    }
}

/// リモコン通信のエラー型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// リモコンとの接続が切れている
    Disconnected,

    /// 接続待ちがタイムアウトした
    Timeout,

    /// 通信エラー（一時的な失敗を含む）
    Io,
}

/// ハブストレージ操作のエラー型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// 読み取りエラー
    ReadFailed,

    /// 書き込みエラー
    WriteFailed,

    /// オフセットまたは長さが範囲外
    OutOfRange,
}

/// 無線ブロードキャストのエラー型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// 送信が受け付けられなかった（他の送信と衝突した場合を含む）
    SendFailed,

    /// 受信バッファの読み取りに失敗した
    ObserveFailed,
}

/// 接続済みリモコン
#[allow(async_fn_in_trait)]
pub trait Remote {
    /// 現在押されているボタンを取得
    fn pressed(&self) -> Result<Buttons, LinkError>;

    /// リモコンの識別情報を読み出して生存を確認
    fn probe(&self) -> Result<(), LinkError>;

    /// リモコンのステータスライトを設定
    async fn set_light(&self, status: Status) -> Result<(), LinkError>;
}

/// リモコンの接続処理
#[allow(async_fn_in_trait)]
pub trait RemoteConnector {
    type Remote: Remote;

    /// リモコンが見つかるまで待機して接続
    ///
    /// タイムアウトは呼び出し側が適用します。
    async fn connect(&mut self) -> Result<Self::Remote, LinkError>;
}

/// モーター1チャネル
pub trait Motor {
    /// 符号付きデューティ比 [%] を設定
    fn set_duty(&self, duty: i16);
}

/// ハブ本体
pub trait Hub {
    /// ユーザーストレージから読み込み
    fn read_storage(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// ユーザーストレージへ書き込み
    fn write_storage(&self, offset: usize, data: &[u8]) -> Result<(), StorageError>;

    /// ハブのステータスライトを設定
    fn set_light(&self, status: Status);

    /// ハブの電源を切る
    fn shutdown(&self);
}

/// 近距離ブロードキャストチャネル
#[allow(async_fn_in_trait)]
pub trait Radio {
    /// データをブロードキャスト（`None` で送信停止）
    async fn broadcast(&self, data: Option<&[u8]>) -> Result<(), RadioError>;

    /// 最新の受信データを `buf` にコピー
    ///
    /// # Returns
    /// * `Ok(Some(len))` - 新しいデータを受信
    /// * `Ok(None)` - 受信データなし
    fn observe(&self, buf: &mut [u8]) -> Result<Option<usize>, RadioError>;
}
