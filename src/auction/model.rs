// region:    --- Imports
use crate::error::AuctionError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Models

// 경매 상품 모델
// is_active는 명시적 종료 또는 만료 스위퍼가 해제하고, is_closed는 낙찰 확정을 기록한다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuctionItem {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub minimum_price: Option<Decimal>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    pub is_closed: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

impl AuctionItem {
    /// 입찰이 없을 때 첫 입찰이 초과해야 하는 하한선
    pub fn reserve_floor(&self) -> Decimal {
        self.minimum_price.unwrap_or(Decimal::ZERO)
    }
}

// 입찰 모델
// 생성 후 불변이며, 권한 있는 삭제 경로를 통해서만 제거된다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// 경매 생성/수정 요청 본문
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub minimum_price: Option<Decimal>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    // 수정 시에만 반영되고, 생성은 항상 활성 상태로 시작한다.
    pub is_active: Option<bool>,
}

impl AuctionDraft {
    /// 생성/수정 공통 검증
    pub fn validate(&self) -> Result<(), AuctionError> {
        if self.name.trim().is_empty() {
            return Err(AuctionError::Validation("Item name is required.".into()));
        }
        if self.end_time <= self.start_time {
            return Err(AuctionError::Validation(
                "End time must be after start time.".into(),
            ));
        }
        if let Some(price) = self.minimum_price {
            if price < Decimal::ZERO {
                return Err(AuctionError::Validation("Invalid minimum price.".into()));
            }
        }
        Ok(())
    }
}

// endregion: --- Models

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn draft() -> AuctionDraft {
        AuctionDraft {
            name: "그림".into(),
            description: String::new(),
            minimum_price: Some(dec!(10.00)),
            start_time: Utc::now(),
            end_time: Utc::now() + Duration::hours(1),
            is_active: None,
        }
    }

    /// 정상 요청 검증
    #[test]
    fn accepts_a_well_formed_draft() {
        assert!(draft().validate().is_ok());
    }

    /// 종료 시간이 시작 시간 이후가 아니면 거부
    #[test]
    fn rejects_end_time_not_after_start_time() {
        let mut d = draft();
        d.end_time = d.start_time;
        assert!(matches!(d.validate(), Err(AuctionError::Validation(_))));
    }

    /// 빈 이름과 음수 하한선 거부
    #[test]
    fn rejects_blank_name_and_negative_floor() {
        let mut d = draft();
        d.name = "  ".into();
        assert!(d.validate().is_err());

        let mut d = draft();
        d.minimum_price = Some(dec!(-1));
        assert!(d.validate().is_err());
    }
}

// endregion: --- Tests
