/// 낙찰자 결정
/// Ended/Closed 상태의 경매에서만 동작한다. "입찰 없음"은 낙찰자 없음으로,
/// 아직 끝나지 않은 경매와는 구분되는 결과다.
// region:    --- Imports
use crate::auction::model::{AuctionItem, Bid};
use crate::bidding::model::{fmt_amount, fmt_time, sort_ledger};
use crate::error::AuctionError;
use crate::lifecycle::{phase_at, AuctionPhase};
use crate::persistence::AuctionStore;
use chrono::{DateTime, Utc};
use serde::Serialize;

// endregion: --- Imports

// region:    --- Resolver

/// 낙찰 입찰 계산: 원장 머리 (금액 내림차순, 동률은 이른 타임스탬프)
pub fn resolve_winner(
    auction: &AuctionItem,
    bids: &[Bid],
    now: DateTime<Utc>,
) -> Result<Option<Bid>, AuctionError> {
    match phase_at(auction, now) {
        AuctionPhase::Scheduled | AuctionPhase::Active => Err(AuctionError::Validation(
            "This auction has not ended yet.".into(),
        )),
        AuctionPhase::Ended | AuctionPhase::Closed => {
            let mut sorted = bids.to_vec();
            sort_ledger(&mut sorted);
            Ok(sorted.into_iter().next())
        }
    }
}

// endregion: --- Resolver

// region:    --- Views

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinningBidView {
    pub bid_id: i64,
    pub bidder_id: i64,
    pub bidder_name: String,
    pub amount: String,
    pub placed_at: String,
}

/// 낙찰 조회 응답. winner가 null이면 입찰 없이 종료된 경매다.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerView {
    pub auction_id: i64,
    pub is_finalized: bool,
    pub winner: Option<WinningBidView>,
}

/// 낙찰 조회
pub async fn winner_view(
    store: &dyn AuctionStore,
    auction: &AuctionItem,
    now: DateTime<Utc>,
) -> Result<WinnerView, AuctionError> {
    let bids = store.list_bids(auction.id).await?;
    let winning = resolve_winner(auction, &bids, now)?;

    let winner = match winning {
        None => None,
        Some(bid) => {
            let name = store
                .get_user_name(bid.bidder_id)
                .await?
                .unwrap_or_else(|| "Unknown".to_string());
            Some(WinningBidView {
                bid_id: bid.id,
                bidder_id: bid.bidder_id,
                bidder_name: name,
                amount: fmt_amount(bid.amount),
                placed_at: fmt_time(bid.created_at),
            })
        }
    };

    Ok(WinnerView {
        auction_id: auction.id,
        is_finalized: auction.is_closed,
        winner,
    })
}

// endregion: --- Views

// region:    --- Tests


// endregion: --- Tests
