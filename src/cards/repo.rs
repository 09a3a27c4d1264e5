use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::cards::domain::{new_pass_id, Card};
use crate::cards::dto::CreateCardRequest;

const CARD_COLUMNS: &str = "id, merchant_id, name, logo, color, total_visits, current_visits, \
     last_redeemed_at, redemption_history, qr_payload, pass_id, created_at";

/// Insert a new card, then attach its QR payload in a second write.
/// The payload encodes the generated card id, so it cannot be written up front.
pub async fn create(
    db: &PgPool,
    merchant_id: Uuid,
    req: &CreateCardRequest,
) -> anyhow::Result<Card> {
    let pass_id = new_pass_id();
    let card = sqlx::query_as::<_, Card>(&format!(
        r#"
        INSERT INTO cards (merchant_id, name, logo, color, total_visits, pass_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {CARD_COLUMNS}
        "#,
    ))
    .bind(merchant_id)
    .bind(req.name.trim())
    .bind(req.logo.trim())
    .bind(req.color.trim())
    .bind(req.total_visits)
    .bind(&pass_id)
    .fetch_one(db)
    .await?;

    let payload = card.qr_payload_json();
    let card = sqlx::query_as::<_, Card>(&format!(
        r#"
        UPDATE cards SET qr_payload = $2
        WHERE id = $1
        RETURNING {CARD_COLUMNS}
        "#,
    ))
    .bind(card.id)
    .bind(&payload)
    .fetch_one(db)
    .await?;

    Ok(card)
}

/// All cards owned by a merchant.
pub async fn list_by_merchant(db: &PgPool, merchant_id: Uuid) -> anyhow::Result<Vec<Card>> {
    let cards = sqlx::query_as::<_, Card>(&format!(
        r#"
        SELECT {CARD_COLUMNS}
        FROM cards
        WHERE merchant_id = $1
        ORDER BY created_at DESC
        "#,
    ))
    .bind(merchant_id)
    .fetch_all(db)
    .await?;
    Ok(cards)
}

/// Load a card scoped to its owner, holding a row lock until the enclosing
/// transaction commits. Keeps concurrent stamp/redeem calls from losing
/// increments on the same card.
pub async fn find_for_update(
    tx: &mut Transaction<'_, Postgres>,
    card_id: Uuid,
    merchant_id: Uuid,
) -> anyhow::Result<Option<Card>> {
    let card = sqlx::query_as::<_, Card>(&format!(
        r#"
        SELECT {CARD_COLUMNS}
        FROM cards
        WHERE id = $1 AND merchant_id = $2
        FOR UPDATE
        "#,
    ))
    .bind(card_id)
    .bind(merchant_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(card)
}

/// Persist the mutable state a stamp or redeem transition touches.
pub async fn save_visit_state(
    tx: &mut Transaction<'_, Postgres>,
    card: &Card,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE cards
        SET current_visits = $2, last_redeemed_at = $3, redemption_history = $4
        WHERE id = $1
        "#,
    )
    .bind(card.id)
    .bind(card.current_visits)
    .bind(card.last_redeemed_at)
    .bind(&card.redemption_history)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
