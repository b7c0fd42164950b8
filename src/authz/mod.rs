/// 권한 평가
/// 역할 정책 테이블은 이 모듈 한 곳에만 둔다. 해석 불가능한 신원/역할은 항상 거부.
// region:    --- Imports
use crate::error::AuctionError;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Roles

/// 시스템 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    AuctionCreator,
    Bidder,
}

impl Role {
    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "Admin" => Some(Role::Admin),
            "AuctionCreator" => Some(Role::AuctionCreator),
            "Bidder" => Some(Role::Bidder),
            _ => None,
        }
    }
}

/// 인증 콜라보레이터가 확인한 요청자 신원
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: Role,
}

// endregion: --- Roles

// region:    --- Actions

/// 권한 평가 대상 액션
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuctionAction {
    CreateAuction,
    EditAuction,
    DeleteAuction,
    SubmitBid,
    DeleteBid,
    EndAuction,
    CloseAuction,
    ViewWinner,
}

// endregion: --- Actions

// region:    --- Policy

/// 역할 정책 테이블
/// resource_owner는 대상 경매를 만든 사용자이며, 생성자 역할의 소유 검사에만 쓰인다.
pub fn permitted(actor: &AuthContext, action: AuctionAction, resource_owner: Option<i64>) -> bool {
    use AuctionAction::*;

    let owns = resource_owner == Some(actor.user_id);

    match actor.role {
        Role::Admin => true,
        Role::AuctionCreator => match action {
            CreateAuction => true,
            DeleteBid | EndAuction | CloseAuction | ViewWinner => owns,
            EditAuction | DeleteAuction | SubmitBid => false,
        },
        Role::Bidder => matches!(action, SubmitBid),
    }
}

/// 권한 검사. 신원이 없으면 인증 오류, 정책 불허면 권한 오류.
pub fn authorize(
    actor: Option<&AuthContext>,
    action: AuctionAction,
    resource_owner: Option<i64>,
) -> Result<AuthContext, AuctionError> {
    let actor = actor.ok_or(AuctionError::Unauthenticated)?;
    if permitted(actor, action, resource_owner) {
        Ok(actor.clone())
    } else {
        Err(AuctionError::Forbidden)
    }
}

// endregion: --- Policy

// region:    --- Authenticator

/// 인증 콜라보레이터 계약: 인바운드 요청에서 {userId, role}을 얻거나 미인증을 돌려준다.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Option<AuthContext>;
}

/// 게이트웨이가 주입한 신원 헤더를 신뢰하는 기본 구현
pub struct HeaderAuthenticator;

impl Authenticator for HeaderAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Option<AuthContext> {
        let user_id = headers
            .get("x-user-id")?
            .to_str()
            .ok()?
            .parse::<i64>()
            .ok()?;
        let role = Role::parse(headers.get("x-user-role")?.to_str().ok()?)?;
        Some(AuthContext { user_id, role })
    }
}

// endregion: --- Authenticator

// region:    --- Tests


// endregion: --- Tests
