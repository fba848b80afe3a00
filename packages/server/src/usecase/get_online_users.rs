//! UseCase: オンラインユーザー一覧の取得

use crate::domain::{OnlineUser, SharedRegistries};

/// オンラインユーザー一覧取得のユースケース
pub struct GetOnlineUsersUseCase {
    registries: SharedRegistries,
}

impl GetOnlineUsersUseCase {
    pub fn new(registries: SharedRegistries) -> Self {
        Self { registries }
    }

    /// ユーザー単位（接続単位ではない）で、ユーザー ID 順に返す
    pub async fn execute(&self) -> Vec<OnlineUser> {
        let registries = self.registries.lock().await;
        registries.presence.list_online()
    }
}
