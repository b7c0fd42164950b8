/// 경매 수명주기
/// 상태는 저장된 플래그와 현재 시각으로부터 매번 다시 계산하며, 전이는 단조적이다.
// region:    --- Imports
use crate::auction::model::AuctionItem;
use chrono::{DateTime, Utc};
use serde::Serialize;

// endregion: --- Imports

// region:    --- Phase

/// 경매 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuctionPhase {
    Scheduled,
    Active,
    Ended,
    Closed,
}

/// 주어진 시각의 경매 상태 계산
/// Ended는 종료 시각 도달 또는 활성 플래그 해제, Closed는 낙찰 확정까지 된 상태.
pub fn phase_at(auction: &AuctionItem, now: DateTime<Utc>) -> AuctionPhase {
    if auction.is_closed {
        return AuctionPhase::Closed;
    }
    if !auction.is_active || now >= auction.end_time {
        return AuctionPhase::Ended;
    }
    if now < auction.start_time {
        return AuctionPhase::Scheduled;
    }
    AuctionPhase::Active
}

// endregion: --- Phase

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn auction(start: DateTime<Utc>, end: DateTime<Utc>) -> AuctionItem {
        AuctionItem {
            id: 1,
            name: "시계".into(),
            description: String::new(),
            minimum_price: None,
            start_time: start,
            end_time: end,
            is_active: true,
            is_closed: false,
            created_by: 1,
            created_at: start,
        }
    }

    /// 시작 전 / 진행 중 / 종료 후 경계 확인
    #[test]
    fn phase_follows_the_clock() {
        let now = Utc::now();
        let a = auction(now - Duration::hours(1), now + Duration::hours(1));

        assert_eq!(phase_at(&a, now - Duration::hours(2)), AuctionPhase::Scheduled);
        assert_eq!(phase_at(&a, a.start_time), AuctionPhase::Active);
        assert_eq!(phase_at(&a, now), AuctionPhase::Active);
        // 종료 시각 도달 즉시 Ended
        assert_eq!(phase_at(&a, a.end_time), AuctionPhase::Ended);
        assert_eq!(phase_at(&a, a.end_time + Duration::seconds(1)), AuctionPhase::Ended);
    }

    /// 활성 플래그가 해제되면 시간과 무관하게 Ended
    #[test]
    fn cleared_active_flag_means_ended() {
        let now = Utc::now();
        let mut a = auction(now - Duration::hours(1), now + Duration::hours(1));
        a.is_active = false;
        assert_eq!(phase_at(&a, now), AuctionPhase::Ended);
    }

    /// 확정 플래그는 Ended보다 우선한다
    #[test]
    fn closed_flag_wins() {
        let now = Utc::now();
        let mut a = auction(now - Duration::hours(2), now - Duration::hours(1));
        a.is_active = false;
        a.is_closed = true;
        assert_eq!(phase_at(&a, now), AuctionPhase::Closed);
    }

    /// 상태는 역행하지 않는다: 시간이 흐를수록 단계가 뒤로 가지 않음
    #[test]
    fn phases_are_monotonic_over_time() {
        let now = Utc::now();
        let a = auction(now, now + Duration::minutes(10));

        let order = |p: AuctionPhase| match p {
            AuctionPhase::Scheduled => 0,
            AuctionPhase::Active => 1,
            AuctionPhase::Ended => 2,
            AuctionPhase::Closed => 3,
        };

        let mut last = 0;
        for minutes in 0..30 {
            let at = now - Duration::minutes(5) + Duration::minutes(minutes);
            let rank = order(phase_at(&a, at));
            assert!(rank >= last);
            last = rank;
        }
    }
}

// endregion: --- Tests
