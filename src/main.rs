// region:    --- Imports
use auction_core::authz::HeaderAuthenticator;
use auction_core::bidding::engine::BiddingEngine;
use auction_core::fanout::AuctionChannels;
use auction_core::handlers::{self, AppState};
use auction_core::persistence::{InMemoryStore, PostgresStore, SharedStore};
use auction_core::scheduler::AuctionScheduler;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Main

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // 저장소 선택: DATABASE_URL이 있으면 Postgres, 없으면 인메모리
    let store: SharedStore = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let store = PostgresStore::connect(&database_url).await?;
            if let Err(e) = store.initialize_schema().await {
                error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
                return Err(e.into());
            }
            info!("{:<12} --> Postgres 저장소 사용", "Main");
            Arc::new(store)
        }
        Err(_) => {
            info!("{:<12} --> 인메모리 저장소 사용", "Main");
            Arc::new(InMemoryStore::new())
        }
    };

    // 팬아웃 채널과 입찰 엔진
    let channels = Arc::new(AuctionChannels::new());
    let engine = Arc::new(BiddingEngine::new(
        Arc::clone(&store),
        Arc::clone(&channels),
    ));

    // 만료 스위퍼 시작
    AuctionScheduler::new(Arc::clone(&store), Arc::clone(&channels))
        .start()
        .await;

    // 라우터 설정
    let state = AppState {
        store,
        engine,
        channels,
        authenticator: Arc::new(HeaderAuthenticator),
    };
    let routes_all = handlers::routes(state);

    // 리스너 생성
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}

// endregion: --- Main
