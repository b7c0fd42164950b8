/// 입찰 직렬화 엔진
/// 핵심 불변식: 한 경매의 "현재 최고가" 읽기와 입찰 추가는 그 경매의 다른 모든
/// 제출에 대해 원자적이어야 한다. 경매 id로 키잉한 뮤텍스가 쓰기 턴을 한 번에
/// 하나만 허용하고, 상태 검사와 커밋은 같은 임계 구역 안에서 수행된다.
/// 서로 다른 경매는 완전히 병렬로 진행된다.
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::bidding::model::{bid_increment, fmt_amount, BidAcceptance};
use crate::error::AuctionError;
use crate::fanout::AuctionChannels;
use crate::lifecycle::{phase_at, AuctionPhase};
use crate::persistence::SharedStore;
use crate::query::render_ledger;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Auction Locks

// 쓰기 턴 대기 한도. 넘기면 호출자에게 재시도를 요청한다.
const WRITE_TURN_WAIT: Duration = Duration::from_secs(2);

// 충돌 시 자동 재시도 횟수 (최초 시도 + 1회)
const COMMIT_ATTEMPTS: u32 = 2;

/// 경매별 쓰기 턴 레지스트리
#[derive(Default)]
struct AuctionLocks {
    slots: StdMutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl AuctionLocks {
    fn slot(&self, auction_id: i64) -> Arc<Mutex<()>> {
        self.slots
            .lock()
            .expect("lock")
            .entry(auction_id)
            .or_default()
            .clone()
    }

    /// 쓰기 턴 획득. 한도 내에 획득하지 못하면 Conflict.
    async fn acquire(&self, auction_id: i64) -> Result<OwnedMutexGuard<()>, AuctionError> {
        timeout(WRITE_TURN_WAIT, self.slot(auction_id).lock_owned())
            .await
            .map_err(|_| AuctionError::Conflict)
    }
}

// endregion: --- Auction Locks

// region:    --- Bidding Engine

pub struct BiddingEngine {
    store: SharedStore,
    channels: Arc<AuctionChannels>,
    locks: AuctionLocks,
}

impl BiddingEngine {
    pub fn new(store: SharedStore, channels: Arc<AuctionChannels>) -> Self {
        Self {
            store,
            channels,
            locks: AuctionLocks::default(),
        }
    }

    /// 입찰 제출
    /// 충돌(쓰기 턴 시간 초과 또는 저장소의 동시 쓰기 보고)이면 최신 상태를
    /// 다시 읽어 한 번 자동 재시도하고, 그래도 충돌이면 그대로 돌려준다.
    pub async fn place_bid(
        &self,
        auction_id: i64,
        bidder_id: i64,
        amount: Decimal,
    ) -> Result<BidAcceptance, AuctionError> {
        for attempt in 1..=COMMIT_ATTEMPTS {
            match self.try_place_bid(auction_id, bidder_id, amount).await {
                Err(AuctionError::Conflict) if attempt < COMMIT_ATTEMPTS => {
                    warn!(
                        "{:<12} --> 경매 {} 입찰 충돌, 최신 상태로 재시도",
                        "Engine", auction_id
                    );
                }
                other => return other,
            }
        }
        Err(AuctionError::Conflict)
    }

    async fn try_place_bid(
        &self,
        auction_id: i64,
        bidder_id: i64,
        amount: Decimal,
    ) -> Result<BidAcceptance, AuctionError> {
        let _turn = self.locks.acquire(auction_id).await?;

        // 여기부터는 이 경매의 유일한 쓰기 주체다. 상태 검사와 커밋이 같은
        // 임계 구역에 있어야 종료 전이와 경합하는 입찰이 끼어들 수 없다.
        let now = Utc::now();
        let auction = self
            .store
            .get_auction(auction_id)
            .await?
            .ok_or(AuctionError::NotFound("Auction"))?;

        if phase_at(&auction, now) != AuctionPhase::Active {
            return Err(AuctionError::Validation(
                "This auction is not currently active.".into(),
            ));
        }

        if amount <= Decimal::ZERO {
            return Err(AuctionError::Validation(
                "Bid amount must be a positive value.".into(),
            ));
        }

        let mut bids = self.store.list_bids(auction_id).await?;
        crate::bidding::model::sort_ledger(&mut bids);
        let minimum_acceptable = bids
            .first()
            .map(|bid| bid.amount)
            .unwrap_or_else(|| auction.reserve_floor());

        if amount <= minimum_acceptable {
            return Err(AuctionError::Validation(format!(
                "Your bid must be higher than {}.",
                fmt_amount(minimum_acceptable)
            )));
        }

        let bid_id = self
            .store
            .create_bid(auction_id, bidder_id, amount, now)
            .await?;

        // 커밋 후 스냅샷 재구성
        let mut ledger = self.store.list_bids(auction_id).await?;
        crate::bidding::model::sort_ledger(&mut ledger);
        let current = ledger
            .first()
            .map(|bid| bid.amount)
            .unwrap_or(amount);
        let views = render_ledger(self.store.as_ref(), &ledger).await?;
        let bidder_name = self
            .store
            .get_user_name(bidder_id)
            .await?
            .unwrap_or_else(|| "Unknown".to_string());

        info!(
            "{:<12} --> 경매 {} 입찰 확정: bid_id={}, 금액={}",
            "Engine",
            auction_id,
            bid_id,
            fmt_amount(amount)
        );

        // 팬아웃은 임계 구역 안에서 발행해 채널 순서 = 커밋 순서를 보장한다.
        // 브로드캐스트 send는 블로킹하지 않으므로 호출자를 붙잡지 않는다.
        self.channels.publish(
            auction_id,
            AuctionEvent::BidPlaced {
                auction_id,
                current_bid: fmt_amount(current),
                bids: views.clone(),
                minimum_next_bid: fmt_amount(current + bid_increment()),
                bidder_name,
                bid_amount: fmt_amount(amount),
            },
        );

        Ok(BidAcceptance {
            success: true,
            message: "Your bid has been placed successfully!".into(),
            current_bid: fmt_amount(current),
            bids: views,
            minimum_next_bid: fmt_amount(current + bid_increment()),
        })
    }

    /// 경매 종료. 이미 종료된 경매면 no-op 성공.
    /// 같은 쓰기 턴을 잡으므로, 종료가 보이는 순간 이후에는 어떤 진행 중
    /// 입찰도 커밋될 수 없다.
    pub async fn end_auction(&self, auction_id: i64) -> Result<(), AuctionError> {
        let _turn = self.locks.acquire(auction_id).await?;

        let now = Utc::now();
        let auction = self
            .store
            .get_auction(auction_id)
            .await?
            .ok_or(AuctionError::NotFound("Auction"))?;

        match phase_at(&auction, now) {
            AuctionPhase::Ended | AuctionPhase::Closed => Ok(()),
            _ => {
                self.store
                    .update_auction_lifecycle_fields(auction_id, now, false, auction.is_closed)
                    .await?;
                info!("{:<12} --> 경매 {} 종료", "Engine", auction_id);
                self.channels.publish(
                    auction_id,
                    AuctionEvent::AuctionEnded {
                        auction_id,
                        ended_at: now,
                    },
                );
                Ok(())
            }
        }
    }

    /// 낙찰 확정 (종료 포함). 이미 확정된 경매면 no-op 성공.
    pub async fn close_auction(&self, auction_id: i64) -> Result<(), AuctionError> {
        let _turn = self.locks.acquire(auction_id).await?;

        let now = Utc::now();
        let auction = self
            .store
            .get_auction(auction_id)
            .await?
            .ok_or(AuctionError::NotFound("Auction"))?;

        if auction.is_closed {
            return Ok(());
        }

        let was_ended = matches!(
            phase_at(&auction, now),
            AuctionPhase::Ended | AuctionPhase::Closed
        );
        let end_time = if was_ended { auction.end_time } else { now };

        self.store
            .update_auction_lifecycle_fields(auction_id, end_time, false, true)
            .await?;
        info!("{:<12} --> 경매 {} 낙찰 확정", "Engine", auction_id);

        if !was_ended {
            self.channels.publish(
                auction_id,
                AuctionEvent::AuctionEnded {
                    auction_id,
                    ended_at: now,
                },
            );
        }
        Ok(())
    }

}

// endregion: --- Bidding Engine

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::model::AuctionDraft;
    use crate::persistence::{AuctionStore, InMemoryStore};
    use chrono::Duration as ChronoDuration;
    use rust_decimal_macros::dec;

    async fn setup() -> (Arc<InMemoryStore>, Arc<AuctionChannels>, BiddingEngine, i64) {
        let store = Arc::new(InMemoryStore::new());
        for user_id in 1..=40 {
            store.insert_user(user_id, &format!("입찰자{user_id}"));
        }
        let auction = store
            .create_auction(
                AuctionDraft {
                    name: "골동품".into(),
                    description: String::new(),
                    minimum_price: Some(dec!(10.00)),
                    start_time: Utc::now() - ChronoDuration::hours(1),
                    end_time: Utc::now() + ChronoDuration::hours(1),
                    is_active: None,
                },
                1,
            )
            .await
            .unwrap();
        let channels = Arc::new(AuctionChannels::new());
        let engine = BiddingEngine::new(store.clone(), channels.clone());
        (store, channels, engine, auction.id)
    }

    /// 하한선과 같은 금액은 거부, 초과만 허용
    #[tokio::test]
    async fn bids_must_exceed_the_minimum_acceptable() {
        let (_, _, engine, auction_id) = setup().await;

        assert!(matches!(
            engine.place_bid(auction_id, 2, dec!(10.00)).await,
            Err(AuctionError::Validation(_))
        ));

        let first = engine.place_bid(auction_id, 2, dec!(10.01)).await.unwrap();
        assert_eq!(first.current_bid, "10.01");
        assert_eq!(first.minimum_next_bid, "10.02");

        assert!(matches!(
            engine.place_bid(auction_id, 3, dec!(10.01)).await,
            Err(AuctionError::Validation(_))
        ));

        let second = engine.place_bid(auction_id, 3, dec!(15.00)).await.unwrap();
        assert_eq!(second.current_bid, "15.00");
        assert_eq!(second.bids.len(), 2);
        assert!(second.bids[0].is_highest);
    }

    /// 같은 금액으로 경쟁하는 동시 제출은 정확히 하나만 성공한다
    #[tokio::test]
    async fn racing_equal_bids_commit_exactly_once() {
        let (_, _, engine, auction_id) = setup().await;
        let engine = Arc::new(engine);

        let mut handles = Vec::new();
        for bidder_id in 2..=21 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine.place_bid(auction_id, bidder_id, dec!(50.00)).await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
    }

    /// 동시 제출이 섞여도 커밋 순서의 금액은 순증가한다
    #[tokio::test]
    async fn committed_amounts_are_strictly_increasing() {
        let (store, _, engine, auction_id) = setup().await;
        let engine = Arc::new(engine);

        let mut handles = Vec::new();
        for step in 1..=30i64 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                let amount = dec!(10.00) + Decimal::new(step, 0);
                let _ = engine.place_bid(auction_id, 2 + (step % 5), amount).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 인메모리 저장소의 id는 커밋 순서대로 증가한다
        let mut bids = store.list_bids(auction_id).await.unwrap();
        bids.sort_by_key(|bid| bid.id);
        assert!(!bids.is_empty());
        for pair in bids.windows(2) {
            assert!(pair[1].amount > pair[0].amount);
        }
    }

    /// 종료된 경매에는 어떤 금액도 커밋되지 않는다
    #[tokio::test]
    async fn ended_auction_rejects_bids() {
        let (_, _, engine, auction_id) = setup().await;

        engine.end_auction(auction_id).await.unwrap();
        assert!(matches!(
            engine.place_bid(auction_id, 2, dec!(100.00)).await,
            Err(AuctionError::Validation(_))
        ));
    }

    /// 종료/확정은 멱등이다
    #[tokio::test]
    async fn end_and_close_are_idempotent() {
        let (store, _, engine, auction_id) = setup().await;

        engine.end_auction(auction_id).await.unwrap();
        engine.end_auction(auction_id).await.unwrap();
        engine.close_auction(auction_id).await.unwrap();
        engine.close_auction(auction_id).await.unwrap();

        let auction = store.get_auction(auction_id).await.unwrap().unwrap();
        assert!(!auction.is_active);
        assert!(auction.is_closed);
    }

    /// 확정 후에도 상태는 역행하지 않는다
    #[tokio::test]
    async fn closed_auction_stays_closed() {
        let (store, _, engine, auction_id) = setup().await;

        engine.close_auction(auction_id).await.unwrap();
        engine.end_auction(auction_id).await.unwrap();

        let auction = store.get_auction(auction_id).await.unwrap().unwrap();
        assert_eq!(phase_at(&auction, Utc::now()), AuctionPhase::Closed);
    }

    /// 입찰 확정 이벤트는 구독자마다 커밋 순서 그대로 도착한다
    #[tokio::test]
    async fn fanout_order_matches_commit_order() {
        let (_, channels, engine, auction_id) = setup().await;
        let mut first = channels.subscribe(auction_id);
        let mut second = channels.subscribe(auction_id);

        for step in 1..=3i64 {
            engine
                .place_bid(auction_id, 2, dec!(10.00) + Decimal::new(step, 0))
                .await
                .unwrap();
        }

        let expected = ["11.00", "12.00", "13.00"];
        for expected_amount in expected {
            for receiver in [&mut first, &mut second] {
                match receiver.recv().await.unwrap() {
                    AuctionEvent::BidPlaced { bid_amount, .. } => {
                        assert_eq!(bid_amount, expected_amount)
                    }
                    other => panic!("unexpected event: {other:?}"),
                }
            }
        }
    }

    /// 쓰기 턴을 한도 내에 얻지 못하면 Conflict로 끝난다
    #[tokio::test(start_paused = true)]
    async fn write_turn_wait_is_bounded() {
        let locks = AuctionLocks::default();
        let _held = locks.acquire(1).await.unwrap();

        assert!(matches!(locks.acquire(1).await, Err(AuctionError::Conflict)));
        // 다른 경매의 턴은 영향을 받지 않는다
        assert!(locks.acquire(2).await.is_ok());
    }
}

// endregion: --- Tests
