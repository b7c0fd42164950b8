/// 경매 만료 스위퍼
/// 종료 시각이 지난 경매의 활성 플래그를 내리고, 그 전이마다 채널에
/// AuctionEnded 이벤트를 한 번 발행한다. 이미 시각상 Ended인 경매만 건드리므로
/// 입찰 커밋의 임계 구역 내 상태 검사와 경합하지 않는다.
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::fanout::AuctionChannels;
use crate::persistence::SharedStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Auction Scheduler

pub struct AuctionScheduler {
    store: SharedStore,
    channels: Arc<AuctionChannels>,
}

impl AuctionScheduler {
    pub fn new(store: SharedStore, channels: Arc<AuctionChannels>) -> Self {
        Self { store, channels }
    }

    /// 스위퍼 시작 (1초 주기)
    pub async fn start(&self) {
        let store = Arc::clone(&self.store);
        let channels = Arc::clone(&self.channels);
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                if let Err(e) = Self::sweep(&store, &channels).await {
                    error!("{:<12} --> 만료 스윕 중 오류 발생: {:?}", "Scheduler", e);
                }
            }
        });
    }

    /// 만료된 활성 경매 정리
    async fn sweep(
        store: &SharedStore,
        channels: &AuctionChannels,
    ) -> Result<(), crate::error::AuctionError> {
        let now = Utc::now();
        let mut retired = 0;

        for auction in store.list_auctions().await? {
            if auction.is_active && auction.end_time <= now {
                store
                    .update_auction_lifecycle_fields(
                        auction.id,
                        auction.end_time,
                        false,
                        auction.is_closed,
                    )
                    .await?;
                channels.publish(
                    auction.id,
                    AuctionEvent::AuctionEnded {
                        auction_id: auction.id,
                        ended_at: auction.end_time,
                    },
                );
                info!("{:<12} --> 경매 {} 만료 처리", "Scheduler", auction.id);
                retired += 1;
            }
        }

        if retired == 0 {
            debug!("{:<12} --> 만료된 경매 없음", "Scheduler");
        }
        Ok(())
    }
}

// endregion: --- Auction Scheduler

// region:    --- Tests


// endregion: --- Tests
