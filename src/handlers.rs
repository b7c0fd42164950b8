/// HTTP/WebSocket 핸들러
/// 흐름은 항상 인증 → 권한 평가 → 엔진/저장소 순서다. 권한 게이트를 통과하기
/// 전에는 어떤 변이도 시작하지 않는다.
// region:    --- Imports
use crate::auction::model::{AuctionDraft, AuctionItem};
use crate::authz::{authorize, AuctionAction, Authenticator};
use crate::bidding::engine::BiddingEngine;
use crate::bidding::model::{BidAcceptance, PlaceBidCommand};
use crate::error::AuctionError;
use crate::fanout::AuctionChannels;
use crate::lifecycle::{phase_at, AuctionPhase};
use crate::persistence::SharedStore;
use crate::query::{self, LedgerView};
use crate::winner::{self, WinnerView};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- App State

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub engine: Arc<BiddingEngine>,
    pub channels: Arc<AuctionChannels>,
    pub authenticator: Arc<dyn Authenticator>,
}

/// 라우터 구성
pub fn routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/auctions",
            get(handle_list_auctions).post(handle_create_auction),
        )
        .route(
            "/auctions/:id",
            get(handle_get_auction)
                .put(handle_edit_auction)
                .delete(handle_delete_auction),
        )
        .route("/bid", post(handle_bid))
        .route("/auctions/:id/bids", get(handle_get_ledger))
        .route("/auctions/:id/bids/:bid_id", delete(handle_delete_bid))
        .route("/auctions/:id/end", post(handle_end_auction))
        .route("/auctions/:id/close", post(handle_close_auction))
        .route("/auctions/:id/winner", get(handle_get_winner))
        .route("/auctions/:id/live", get(handle_auction_live))
        .layer(cors)
        .with_state(state)
}

fn ok_message(message: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true, "message": message }))
}

// endregion: --- App State

// region:    --- Command Handlers

/// 입찰 요청 처리
pub async fn handle_bid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(cmd): Json<PlaceBidCommand>,
) -> Result<Json<BidAcceptance>, AuctionError> {
    let identity = state.authenticator.authenticate(&headers);
    let actor = authorize(identity.as_ref(), AuctionAction::SubmitBid, None)?;

    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);
    let acceptance = state
        .engine
        .place_bid(cmd.auction_id, actor.user_id, cmd.bid_amount)
        .await?;
    Ok(Json(acceptance))
}

/// 경매 생성
pub async fn handle_create_auction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(draft): Json<AuctionDraft>,
) -> Result<Json<AuctionItem>, AuctionError> {
    let identity = state.authenticator.authenticate(&headers);
    let actor = authorize(identity.as_ref(), AuctionAction::CreateAuction, None)?;

    draft.validate()?;
    let auction = state.store.create_auction(draft, actor.user_id).await?;
    info!("{:<12} --> 경매 생성: id={}", "Command", auction.id);
    Ok(Json(auction))
}

/// 경매 수정
pub async fn handle_edit_auction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(auction_id): Path<i64>,
    Json(draft): Json<AuctionDraft>,
) -> Result<Json<AuctionItem>, AuctionError> {
    let identity = state.authenticator.authenticate(&headers);
    authorize(identity.as_ref(), AuctionAction::EditAuction, None)?;

    draft.validate()?;
    let auction = state.store.update_auction(auction_id, draft).await?;
    info!("{:<12} --> 경매 수정: id={}", "Command", auction_id);
    Ok(Json(auction))
}

/// 경매 삭제 (입찰 포함)
pub async fn handle_delete_auction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(auction_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AuctionError> {
    let identity = state.authenticator.authenticate(&headers);
    authorize(identity.as_ref(), AuctionAction::DeleteAuction, None)?;

    state.store.delete_auction_cascade(auction_id).await?;
    info!("{:<12} --> 경매 삭제: id={}", "Command", auction_id);
    Ok(ok_message("Auction deleted successfully."))
}

/// 입찰 삭제
/// 관리자는 모든 입찰, 생성자는 자기 경매의 입찰만 지울 수 있다.
/// 삭제가 다른 입찰의 유효성을 소급해서 재검증하지는 않는다.
pub async fn handle_delete_bid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((_auction_id, bid_id)): Path<(i64, i64)>,
) -> Result<Json<serde_json::Value>, AuctionError> {
    let bid = state
        .store
        .get_bid(bid_id)
        .await?
        .ok_or(AuctionError::NotFound("Bid"))?;
    let auction = state
        .store
        .get_auction(bid.auction_id)
        .await?
        .ok_or(AuctionError::NotFound("Auction"))?;

    let identity = state.authenticator.authenticate(&headers);
    authorize(
        identity.as_ref(),
        AuctionAction::DeleteBid,
        Some(auction.created_by),
    )?;

    state.store.delete_bid(bid_id).await?;
    info!("{:<12} --> 입찰 삭제: bid_id={}", "Command", bid_id);
    Ok(ok_message("Bid deleted successfully."))
}

/// 경매 종료
pub async fn handle_end_auction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(auction_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AuctionError> {
    let auction = state
        .store
        .get_auction(auction_id)
        .await?
        .ok_or(AuctionError::NotFound("Auction"))?;

    let identity = state.authenticator.authenticate(&headers);
    authorize(
        identity.as_ref(),
        AuctionAction::EndAuction,
        Some(auction.created_by),
    )?;

    state.engine.end_auction(auction_id).await?;
    Ok(ok_message("Auction ended successfully."))
}

/// 낙찰 확정
pub async fn handle_close_auction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(auction_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AuctionError> {
    let auction = state
        .store
        .get_auction(auction_id)
        .await?
        .ok_or(AuctionError::NotFound("Auction"))?;

    let identity = state.authenticator.authenticate(&headers);
    authorize(
        identity.as_ref(),
        AuctionAction::CloseAuction,
        Some(auction.created_by),
    )?;

    state.engine.close_auction(auction_id).await?;
    Ok(ok_message("Auction closed successfully."))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// 경매 상세 응답
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionDetail {
    #[serde(flatten)]
    pub auction: AuctionItem,
    pub phase: AuctionPhase,
    pub channel: String,
    pub ledger: LedgerView,
}

/// 모든 경매 조회
pub async fn handle_list_auctions(
    State(state): State<AppState>,
) -> Result<Json<Vec<AuctionItem>>, AuctionError> {
    info!("{:<12} --> 모든 경매 조회", "HandlerQuery");
    Ok(Json(state.store.list_auctions().await?))
}

/// 경매 상세 조회 (상태 + 원장 포함)
pub async fn handle_get_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> Result<Json<AuctionDetail>, AuctionError> {
    info!("{:<12} --> 경매 상세 조회 id: {}", "HandlerQuery", auction_id);
    let auction = state
        .store
        .get_auction(auction_id)
        .await?
        .ok_or(AuctionError::NotFound("Auction"))?;
    let ledger = query::ledger_view(state.store.as_ref(), auction_id).await?;
    let phase = phase_at(&auction, Utc::now());

    Ok(Json(AuctionDetail {
        auction,
        phase,
        channel: AuctionChannels::channel_name(auction_id),
        ledger,
    }))
}

/// 경매 원장 조회
pub async fn handle_get_ledger(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> Result<Json<LedgerView>, AuctionError> {
    info!("{:<12} --> 원장 조회 id: {}", "HandlerQuery", auction_id);
    Ok(Json(
        query::ledger_view(state.store.as_ref(), auction_id).await?,
    ))
}

/// 낙찰 조회
pub async fn handle_get_winner(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(auction_id): Path<i64>,
) -> Result<Json<WinnerView>, AuctionError> {
    let auction = state
        .store
        .get_auction(auction_id)
        .await?
        .ok_or(AuctionError::NotFound("Auction"))?;

    let identity = state.authenticator.authenticate(&headers);
    authorize(
        identity.as_ref(),
        AuctionAction::ViewWinner,
        Some(auction.created_by),
    )?;

    info!("{:<12} --> 낙찰 조회 id: {}", "HandlerQuery", auction_id);
    Ok(Json(
        winner::winner_view(state.store.as_ref(), &auction, Utc::now()).await?,
    ))
}

// endregion: --- Query Handlers

// region:    --- Live Channel

/// 실시간 채널 참가 (WebSocket)
/// 소켓을 닫으면 탈퇴다. 참가/탈퇴는 원장에 아무 영향도 주지 않는다.
pub async fn handle_auction_live(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
    ws: WebSocketUpgrade,
) -> Result<Response, AuctionError> {
    state
        .store
        .get_auction(auction_id)
        .await?
        .ok_or(AuctionError::NotFound("Auction"))?;

    // 업그레이드 전에 구독해 참가 이후의 이벤트를 빠짐없이 받는다.
    let receiver = state.channels.subscribe(auction_id);
    info!(
        "{:<12} --> {} 채널 참가",
        "Live",
        AuctionChannels::channel_name(auction_id)
    );
    Ok(ws.on_upgrade(move |socket| stream_auction_events(socket, receiver, auction_id)))
}

/// 브로드캐스트 수신분을 소켓으로 중계
async fn stream_auction_events(
    mut socket: WebSocket,
    mut receiver: broadcast::Receiver<crate::auction::events::AuctionEvent>,
    auction_id: i64,
) {
    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!("{:<12} --> 이벤트 직렬화 오류: {:?}", "Live", e);
                            continue;
                        }
                    };
                    if socket.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                // 밀린 구독자는 놓친 이벤트를 건너뛰고 계속 받는다
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(
                        "{:<12} --> {} 채널 구독자가 {}개 이벤트를 놓침",
                        "Live",
                        AuctionChannels::channel_name(auction_id),
                        missed
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = socket.recv() => match message {
                Some(Ok(_)) => continue,
                _ => break,
            },
        }
    }
    info!(
        "{:<12} --> {} 채널 탈퇴",
        "Live",
        AuctionChannels::channel_name(auction_id)
    );
}

// endregion: --- Live Channel
