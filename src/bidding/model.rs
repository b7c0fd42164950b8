// region:    --- Imports
use crate::auction::model::Bid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Commands

/// 입찰 명령. 입찰자 신원은 인증 콜라보레이터가 채운다.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBidCommand {
    pub auction_id: i64,
    pub bid_amount: Decimal,
}

// endregion: --- Commands

// region:    --- Ledger

/// 최소 통화 단위. minimumNextBid = 현재 최고가 + 이 값.
pub fn bid_increment() -> Decimal {
    Decimal::new(1, 2)
}

/// 원장 정렬: 금액 내림차순, 동률이면 먼저 들어온 입찰 우선
pub fn sort_ledger(bids: &mut [Bid]) {
    bids.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

/// 금액을 두 자리 소수 문자열로
pub fn fmt_amount(amount: Decimal) -> String {
    format!("{amount:.2}")
}

/// 타임스탬프 표시 형식
pub fn fmt_time(time: DateTime<Utc>) -> String {
    time.format("%b %d, %Y %H:%M").to_string()
}

// endregion: --- Ledger

// region:    --- Views

/// 원장 한 줄 (와이어 표현)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidView {
    pub id: i64,
    pub bidder_name: String,
    pub amount: String,
    pub time: String,
    pub is_highest: bool,
}

/// 입찰 확정 응답: 갱신된 원장 스냅샷과 다음 입찰 하한
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidAcceptance {
    pub success: bool,
    pub message: String,
    pub current_bid: String,
    pub bids: Vec<BidView>,
    pub minimum_next_bid: String,
}

// endregion: --- Views

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn bid(id: i64, amount: Decimal, at: DateTime<Utc>) -> Bid {
        Bid {
            id,
            auction_id: 1,
            bidder_id: id,
            amount,
            created_at: at,
        }
    }

    /// 금액 내림차순, 동률은 이른 타임스탬프 우선
    #[test]
    fn ledger_orders_by_amount_then_earliest_time() {
        let t0 = Utc::now();
        let mut bids = vec![
            bid(1, dec!(10.00), t0),
            bid(2, dec!(50.00), t0 + Duration::seconds(2)),
            bid(3, dec!(50.00), t0 + Duration::seconds(1)),
            bid(4, dec!(20.00), t0 + Duration::seconds(3)),
        ];
        sort_ledger(&mut bids);
        assert_eq!(
            bids.iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![3, 2, 4, 1]
        );
    }

    /// 금액 문자열은 항상 두 자리 소수
    #[test]
    fn amounts_render_with_two_decimals() {
        assert_eq!(fmt_amount(dec!(10)), "10.00");
        assert_eq!(fmt_amount(dec!(10.5)), "10.50");
        assert_eq!(fmt_amount(dec!(10.01) + bid_increment()), "10.02");
    }
}

// endregion: --- Tests
