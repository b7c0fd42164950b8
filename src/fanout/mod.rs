/// 실시간 알림 팬아웃
/// 경매마다 브로드캐스트 채널을 하나씩 두고, 확정된 이벤트를 구독자 전원에게
/// 커밋 순서 그대로 전달한다. 전달은 best-effort이며 끊긴 구독자는 그냥 놓친다.
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

// endregion: --- Imports

// region:    --- Auction Channels

// 구독자가 밀리면 링 버퍼에서 오래된 이벤트부터 버려진다 (at-most-once).
const CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
pub struct AuctionChannels {
    channels: Mutex<HashMap<i64, broadcast::Sender<AuctionEvent>>>,
}

impl AuctionChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// 논리 채널 이름
    pub fn channel_name(auction_id: i64) -> String {
        format!("Auction_{auction_id}")
    }

    /// 채널 구독 (join). 탈퇴는 리시버를 드롭하면 된다.
    pub fn subscribe(&self, auction_id: i64) -> broadcast::Receiver<AuctionEvent> {
        self.sender(auction_id).subscribe()
    }

    /// 이벤트 발행. 구독자가 없으면 조용히 버린다.
    pub fn publish(&self, auction_id: i64, event: AuctionEvent) {
        let delivered = self.sender(auction_id).send(event).unwrap_or(0);
        debug!(
            "{:<12} --> {} 채널에 이벤트 발행 (구독자 {}명)",
            "Fanout",
            Self::channel_name(auction_id),
            delivered
        );
    }

    fn sender(&self, auction_id: i64) -> broadcast::Sender<AuctionEvent> {
        self.channels
            .lock()
            .expect("lock")
            .entry(auction_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

// endregion: --- Auction Channels

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ended(auction_id: i64) -> AuctionEvent {
        AuctionEvent::AuctionEnded {
            auction_id,
            ended_at: Utc::now(),
        }
    }

    /// 같은 채널의 두 구독자는 동일한 이벤트를 동일한 순서로 받는다
    #[tokio::test]
    async fn subscribers_observe_identical_ordered_sequences() {
        let channels = AuctionChannels::new();
        let mut first = channels.subscribe(1);
        let mut second = channels.subscribe(1);

        let events: Vec<AuctionEvent> = (0..5).map(|_| ended(1)).collect();
        for event in &events {
            channels.publish(1, event.clone());
        }

        for expected in &events {
            assert_eq!(first.recv().await.unwrap(), *expected);
            assert_eq!(second.recv().await.unwrap(), *expected);
        }
    }

    /// 다른 경매의 채널은 서로 간섭하지 않는다
    #[tokio::test]
    async fn channels_are_isolated_per_auction() {
        let channels = AuctionChannels::new();
        let mut one = channels.subscribe(1);
        let mut two = channels.subscribe(2);

        channels.publish(1, ended(1));
        channels.publish(2, ended(2));

        assert!(matches!(
            one.recv().await.unwrap(),
            AuctionEvent::AuctionEnded { auction_id: 1, .. }
        ));
        assert!(matches!(
            two.recv().await.unwrap(),
            AuctionEvent::AuctionEnded { auction_id: 2, .. }
        ));
        assert!(one.try_recv().is_err());
        assert!(two.try_recv().is_err());
    }

    /// 구독 전에 발행된 이벤트는 전달되지 않는다 (리플레이 없음)
    #[tokio::test]
    async fn no_replay_for_late_subscribers() {
        let channels = AuctionChannels::new();
        channels.publish(1, ended(1));

        let mut late = channels.subscribe(1);
        assert!(late.try_recv().is_err());
    }
}

// endregion: --- Tests
