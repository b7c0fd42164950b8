/// Postgres 저장소
/// 스키마 부트스트랩과 쿼리는 모두 런타임 바인딩으로 수행한다.
// region:    --- Imports
use crate::auction::model::{AuctionDraft, AuctionItem, Bid};
use crate::error::AuctionError;
use crate::persistence::AuctionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::info;

// endregion: --- Imports

// region:    --- Queries

const CREATE_AUCTION: &str = r#"
    INSERT INTO auctions (name, description, minimum_price, start_time, end_time, is_active, is_closed, created_by, created_at)
    VALUES ($1, $2, $3, $4, $5, TRUE, FALSE, $6, $7)
    RETURNING *
"#;

const UPDATE_AUCTION: &str = r#"
    UPDATE auctions
    SET name = $2, description = $3, minimum_price = $4, start_time = $5, end_time = $6,
        is_active = COALESCE($7, is_active)
    WHERE id = $1
    RETURNING *
"#;

const GET_AUCTION: &str = "SELECT * FROM auctions WHERE id = $1";

const LIST_AUCTIONS: &str = "SELECT * FROM auctions ORDER BY created_at DESC, id DESC";

const UPDATE_LIFECYCLE_FIELDS: &str = r#"
    UPDATE auctions SET end_time = $2, is_active = $3, is_closed = $4 WHERE id = $1
"#;

const DELETE_AUCTION: &str = "DELETE FROM auctions WHERE id = $1";

// 같은 경매에 같거나 더 높은 입찰이 이미 있으면 삽입하지 않는다.
const CREATE_BID: &str = r#"
    INSERT INTO bids (auction_id, bidder_id, amount, created_at)
    SELECT $1, $2, $3, $4
    WHERE NOT EXISTS (SELECT 1 FROM bids WHERE auction_id = $1 AND amount >= $3)
    RETURNING id
"#;

const LIST_BIDS: &str = "SELECT * FROM bids WHERE auction_id = $1";

const GET_BID: &str = "SELECT * FROM bids WHERE id = $1";

const DELETE_BID: &str = "DELETE FROM bids WHERE id = $1";

const GET_USER_NAME: &str = "SELECT name FROM users WHERE id = $1";

// endregion: --- Queries

// region:    --- Postgres Store

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// 커넥션 풀 생성
    pub async fn connect(database_url: &str) -> Result<Self, AuctionError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// 스키마 초기화
    pub async fn initialize_schema(&self) -> Result<(), AuctionError> {
        let schema_sql = include_str!("../sql/01-create-schema.sql");
        self.execute_multi_query(schema_sql).await?;
        info!("{:<12} --> 데이터베이스 스키마 초기화 성공", "Store");
        Ok(())
    }

    /// 세미콜론으로 구분된 여러 쿼리 실행
    async fn execute_multi_query(&self, sql: &str) -> Result<(), AuctionError> {
        for query in sql.split(';') {
            let query = query.trim();
            if !query.is_empty() {
                sqlx::query(query).execute(&self.pool).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AuctionStore for PostgresStore {
    async fn create_auction(
        &self,
        draft: AuctionDraft,
        created_by: i64,
    ) -> Result<AuctionItem, AuctionError> {
        let auction = sqlx::query_as::<_, AuctionItem>(CREATE_AUCTION)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(draft.minimum_price)
            .bind(draft.start_time)
            .bind(draft.end_time)
            .bind(created_by)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
        Ok(auction)
    }

    async fn update_auction(
        &self,
        auction_id: i64,
        draft: AuctionDraft,
    ) -> Result<AuctionItem, AuctionError> {
        sqlx::query_as::<_, AuctionItem>(UPDATE_AUCTION)
            .bind(auction_id)
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(draft.minimum_price)
            .bind(draft.start_time)
            .bind(draft.end_time)
            .bind(draft.is_active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AuctionError::NotFound("Auction"))
    }

    async fn get_auction(&self, auction_id: i64) -> Result<Option<AuctionItem>, AuctionError> {
        Ok(sqlx::query_as::<_, AuctionItem>(GET_AUCTION)
            .bind(auction_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_auctions(&self) -> Result<Vec<AuctionItem>, AuctionError> {
        Ok(sqlx::query_as::<_, AuctionItem>(LIST_AUCTIONS)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_auction_lifecycle_fields(
        &self,
        auction_id: i64,
        end_time: DateTime<Utc>,
        is_active: bool,
        is_closed: bool,
    ) -> Result<(), AuctionError> {
        let result = sqlx::query(UPDATE_LIFECYCLE_FIELDS)
            .bind(auction_id)
            .bind(end_time)
            .bind(is_active)
            .bind(is_closed)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AuctionError::NotFound("Auction"));
        }
        Ok(())
    }

    async fn delete_auction_cascade(&self, auction_id: i64) -> Result<(), AuctionError> {
        // 입찰은 FK ON DELETE CASCADE로 함께 삭제된다.
        let result = sqlx::query(DELETE_AUCTION)
            .bind(auction_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AuctionError::NotFound("Auction"));
        }
        Ok(())
    }

    async fn create_bid(
        &self,
        auction_id: i64,
        bidder_id: i64,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<i64, AuctionError> {
        sqlx::query_scalar::<_, i64>(CREATE_BID)
            .bind(auction_id)
            .bind(bidder_id)
            .bind(amount)
            .bind(created_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AuctionError::Conflict)
    }

    async fn list_bids(&self, auction_id: i64) -> Result<Vec<Bid>, AuctionError> {
        Ok(sqlx::query_as::<_, Bid>(LIST_BIDS)
            .bind(auction_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_bid(&self, bid_id: i64) -> Result<Option<Bid>, AuctionError> {
        Ok(sqlx::query_as::<_, Bid>(GET_BID)
            .bind(bid_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_bid(&self, bid_id: i64) -> Result<(), AuctionError> {
        let result = sqlx::query(DELETE_BID).bind(bid_id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AuctionError::NotFound("Bid"));
        }
        Ok(())
    }

    async fn get_user_name(&self, user_id: i64) -> Result<Option<String>, AuctionError> {
        let row = sqlx::query(GET_USER_NAME)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("name")))
    }
}

// endregion: --- Postgres Store
