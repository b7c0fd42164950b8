/// 인메모리 저장소
/// DATABASE_URL 없이 기동할 때와 테스트에서 사용한다. 모든 연산은 단일 뮤텍스 아래서
/// 원자적으로 수행되므로 읽기는 항상 일관된 스냅샷을 본다.
// region:    --- Imports
use crate::auction::model::{AuctionDraft, AuctionItem, Bid};
use crate::error::AuctionError;
use crate::persistence::AuctionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

// endregion: --- Imports

// region:    --- In-Memory Store

#[derive(Default)]
struct StoreState {
    auctions: HashMap<i64, AuctionItem>,
    bids: HashMap<i64, Bid>,
    users: HashMap<i64, String>,
    next_auction_id: i64,
    next_bid_id: i64,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 테스트/로컬 기동용 사용자 시드
    pub fn insert_user(&self, user_id: i64, name: &str) {
        self.state
            .lock()
            .expect("lock")
            .users
            .insert(user_id, name.to_string());
    }
}

#[async_trait]
impl AuctionStore for InMemoryStore {
    async fn create_auction(
        &self,
        draft: AuctionDraft,
        created_by: i64,
    ) -> Result<AuctionItem, AuctionError> {
        let mut state = self.state.lock().expect("lock");
        state.next_auction_id += 1;
        let auction = AuctionItem {
            id: state.next_auction_id,
            name: draft.name,
            description: draft.description,
            minimum_price: draft.minimum_price,
            start_time: draft.start_time,
            end_time: draft.end_time,
            is_active: true,
            is_closed: false,
            created_by,
            created_at: Utc::now(),
        };
        state.auctions.insert(auction.id, auction.clone());
        Ok(auction)
    }

    async fn update_auction(
        &self,
        auction_id: i64,
        draft: AuctionDraft,
    ) -> Result<AuctionItem, AuctionError> {
        let mut state = self.state.lock().expect("lock");
        let auction = state
            .auctions
            .get_mut(&auction_id)
            .ok_or(AuctionError::NotFound("Auction"))?;
        auction.name = draft.name;
        auction.description = draft.description;
        auction.minimum_price = draft.minimum_price;
        auction.start_time = draft.start_time;
        auction.end_time = draft.end_time;
        if let Some(is_active) = draft.is_active {
            auction.is_active = is_active;
        }
        Ok(auction.clone())
    }

    async fn get_auction(&self, auction_id: i64) -> Result<Option<AuctionItem>, AuctionError> {
        Ok(self
            .state
            .lock()
            .expect("lock")
            .auctions
            .get(&auction_id)
            .cloned())
    }

    async fn list_auctions(&self) -> Result<Vec<AuctionItem>, AuctionError> {
        let state = self.state.lock().expect("lock");
        let mut auctions: Vec<AuctionItem> = state.auctions.values().cloned().collect();
        auctions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(auctions)
    }

    async fn update_auction_lifecycle_fields(
        &self,
        auction_id: i64,
        end_time: DateTime<Utc>,
        is_active: bool,
        is_closed: bool,
    ) -> Result<(), AuctionError> {
        let mut state = self.state.lock().expect("lock");
        let auction = state
            .auctions
            .get_mut(&auction_id)
            .ok_or(AuctionError::NotFound("Auction"))?;
        auction.end_time = end_time;
        auction.is_active = is_active;
        auction.is_closed = is_closed;
        Ok(())
    }

    async fn delete_auction_cascade(&self, auction_id: i64) -> Result<(), AuctionError> {
        let mut state = self.state.lock().expect("lock");
        state
            .auctions
            .remove(&auction_id)
            .ok_or(AuctionError::NotFound("Auction"))?;
        state.bids.retain(|_, bid| bid.auction_id != auction_id);
        Ok(())
    }

    async fn create_bid(
        &self,
        auction_id: i64,
        bidder_id: i64,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<i64, AuctionError> {
        let mut state = self.state.lock().expect("lock");
        if !state.auctions.contains_key(&auction_id) {
            return Err(AuctionError::NotFound("Auction"));
        }
        // 동일 금액 포함, 더 높은 입찰이 먼저 들어왔다면 거부
        let outbid = state
            .bids
            .values()
            .any(|bid| bid.auction_id == auction_id && bid.amount >= amount);
        if outbid {
            return Err(AuctionError::Conflict);
        }
        state.next_bid_id += 1;
        let bid = Bid {
            id: state.next_bid_id,
            auction_id,
            bidder_id,
            amount,
            created_at,
        };
        state.bids.insert(bid.id, bid);
        Ok(state.next_bid_id)
    }

    async fn list_bids(&self, auction_id: i64) -> Result<Vec<Bid>, AuctionError> {
        let state = self.state.lock().expect("lock");
        Ok(state
            .bids
            .values()
            .filter(|bid| bid.auction_id == auction_id)
            .cloned()
            .collect())
    }

    async fn get_bid(&self, bid_id: i64) -> Result<Option<Bid>, AuctionError> {
        Ok(self.state.lock().expect("lock").bids.get(&bid_id).cloned())
    }

    async fn delete_bid(&self, bid_id: i64) -> Result<(), AuctionError> {
        self.state
            .lock()
            .expect("lock")
            .bids
            .remove(&bid_id)
            .ok_or(AuctionError::NotFound("Bid"))?;
        Ok(())
    }

    async fn get_user_name(&self, user_id: i64) -> Result<Option<String>, AuctionError> {
        Ok(self
            .state
            .lock()
            .expect("lock")
            .users
            .get(&user_id)
            .cloned())
    }
}

// endregion: --- In-Memory Store

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn draft() -> AuctionDraft {
        AuctionDraft {
            name: "도자기".into(),
            description: "테스트".into(),
            minimum_price: Some(dec!(5.00)),
            start_time: Utc::now() - Duration::hours(1),
            end_time: Utc::now() + Duration::hours(1),
            is_active: None,
        }
    }

    /// 같은 경매에 같거나 더 높은 입찰이 있으면 저장을 거부한다
    #[tokio::test]
    async fn create_bid_refuses_stale_amounts() {
        let store = InMemoryStore::new();
        let auction = store.create_auction(draft(), 1).await.unwrap();

        store
            .create_bid(auction.id, 2, dec!(10.00), Utc::now())
            .await
            .unwrap();

        assert!(matches!(
            store.create_bid(auction.id, 3, dec!(10.00), Utc::now()).await,
            Err(AuctionError::Conflict)
        ));
        assert!(matches!(
            store.create_bid(auction.id, 3, dec!(9.00), Utc::now()).await,
            Err(AuctionError::Conflict)
        ));
        // 다른 경매에는 영향 없음
        let other = store.create_auction(draft(), 1).await.unwrap();
        assert!(store
            .create_bid(other.id, 3, dec!(10.00), Utc::now())
            .await
            .is_ok());
    }

    /// 경매 삭제 시 입찰도 함께 삭제된다
    #[tokio::test]
    async fn delete_auction_cascades_to_bids() {
        let store = InMemoryStore::new();
        let auction = store.create_auction(draft(), 1).await.unwrap();
        let bid_id = store
            .create_bid(auction.id, 2, dec!(6.00), Utc::now())
            .await
            .unwrap();

        store.delete_auction_cascade(auction.id).await.unwrap();

        assert!(store.get_auction(auction.id).await.unwrap().is_none());
        assert!(store.get_bid(bid_id).await.unwrap().is_none());
    }
}

// endregion: --- Tests
