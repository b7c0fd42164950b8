use crate::bidding::model::BidView;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 경매 채널로 발행되는 실시간 이벤트
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AuctionEvent {
    // 입찰 확정 이벤트: 확정 직후 갱신된 원장 스냅샷을 그대로 전달한다.
    #[serde(rename_all = "camelCase")]
    BidPlaced {
        auction_id: i64,
        current_bid: String,
        bids: Vec<BidView>,
        minimum_next_bid: String,
        bidder_name: String,
        bid_amount: String,
    },
    // 경매 종료 이벤트
    #[serde(rename_all = "camelCase")]
    AuctionEnded {
        auction_id: i64,
        ended_at: DateTime<Utc>,
    },
}
