/// 조회 측 뷰 구성
/// 원장/낙찰 조회는 쓰기와 동시에 실행될 수 있으며, 저장소가 돌려준 스냅샷만 본다.
// region:    --- Imports
use crate::auction::model::Bid;
use crate::bidding::model::{bid_increment, fmt_amount, fmt_time, BidView};
use crate::error::AuctionError;
use crate::persistence::AuctionStore;
use serde::Serialize;
use std::collections::HashMap;

// endregion: --- Imports

// region:    --- Ledger View

/// 원장 스냅샷 (와이어 표현)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerView {
    pub auction_id: i64,
    pub current_bid: String,
    pub bids: Vec<BidView>,
    pub minimum_next_bid: String,
}

/// 정렬된 입찰 목록을 표시용 행으로 변환. 이름 없는 입찰자는 "Unknown".
pub async fn render_ledger(
    store: &dyn AuctionStore,
    bids: &[Bid],
) -> Result<Vec<BidView>, AuctionError> {
    let mut names: HashMap<i64, String> = HashMap::new();
    let mut views = Vec::with_capacity(bids.len());

    for (index, bid) in bids.iter().enumerate() {
        let name = match names.get(&bid.bidder_id) {
            Some(name) => name.clone(),
            None => {
                let name = store
                    .get_user_name(bid.bidder_id)
                    .await?
                    .unwrap_or_else(|| "Unknown".to_string());
                names.insert(bid.bidder_id, name.clone());
                name
            }
        };
        views.push(BidView {
            id: bid.id,
            bidder_name: name,
            amount: fmt_amount(bid.amount),
            time: fmt_time(bid.created_at),
            is_highest: index == 0,
        });
    }

    Ok(views)
}

/// 경매 원장 조회
pub async fn ledger_view(
    store: &dyn AuctionStore,
    auction_id: i64,
) -> Result<LedgerView, AuctionError> {
    let auction = store
        .get_auction(auction_id)
        .await?
        .ok_or(AuctionError::NotFound("Auction"))?;

    let mut bids = store.list_bids(auction_id).await?;
    crate::bidding::model::sort_ledger(&mut bids);

    let current = bids
        .first()
        .map(|bid| bid.amount)
        .unwrap_or_else(|| auction.reserve_floor());
    let views = render_ledger(store, &bids).await?;

    Ok(LedgerView {
        auction_id,
        current_bid: fmt_amount(current),
        bids: views,
        minimum_next_bid: fmt_amount(current + bid_increment()),
    })
}

// endregion: --- Ledger View
