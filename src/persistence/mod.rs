/// 영속 계층 계약
/// 입찰/경매 저장은 이 트레이트 뒤에 숨기고, 구현체는 인메모리와 Postgres 두 가지를 둔다.
// region:    --- Imports
use crate::auction::model::{AuctionDraft, AuctionItem, Bid};
use crate::error::AuctionError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

// endregion: --- Imports

// region:    --- Store Trait

/// 경매 저장소 트레이트
#[async_trait]
pub trait AuctionStore: Send + Sync {
    async fn create_auction(
        &self,
        draft: AuctionDraft,
        created_by: i64,
    ) -> Result<AuctionItem, AuctionError>;

    async fn update_auction(
        &self,
        auction_id: i64,
        draft: AuctionDraft,
    ) -> Result<AuctionItem, AuctionError>;

    async fn get_auction(&self, auction_id: i64) -> Result<Option<AuctionItem>, AuctionError>;

    async fn list_auctions(&self) -> Result<Vec<AuctionItem>, AuctionError>;

    /// 수명주기 필드만 갱신 (종료/확정/만료 스위퍼 전용)
    async fn update_auction_lifecycle_fields(
        &self,
        auction_id: i64,
        end_time: DateTime<Utc>,
        is_active: bool,
        is_closed: bool,
    ) -> Result<(), AuctionError>;

    /// 경매 삭제. 입찰은 함께 삭제된다.
    async fn delete_auction_cascade(&self, auction_id: i64) -> Result<(), AuctionError>;

    /// 입찰 저장. 같은 경매에 amount 이상인 입찰이 이미 있으면 Conflict.
    /// 경매별 쓰기 턴과 별개로 저장소 쪽에서도 단조 증가를 지키는 최후 방어선이다.
    async fn create_bid(
        &self,
        auction_id: i64,
        bidder_id: i64,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<i64, AuctionError>;

    async fn list_bids(&self, auction_id: i64) -> Result<Vec<Bid>, AuctionError>;

    async fn get_bid(&self, bid_id: i64) -> Result<Option<Bid>, AuctionError>;

    async fn delete_bid(&self, bid_id: i64) -> Result<(), AuctionError>;

    /// 사용자 표시 이름 조회. 사용자 디렉터리는 신원 서브시스템 소유라 읽기만 한다.
    async fn get_user_name(&self, user_id: i64) -> Result<Option<String>, AuctionError>;
}

pub type SharedStore = Arc<dyn AuctionStore>;

// endregion: --- Store Trait

// region:    --- Implementations

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

// endregion: --- Implementations
