use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::error::StoreError;
use crate::id::FactionId;
use crate::model::{Faction, Land, LandKey, Relation, RelationKind};
use crate::persist::LedgerSnapshot;

/// Read every stored faction, claimed cell and relation edge.
pub async fn read_snapshot(pool: &PgPool) -> Result<LedgerSnapshot, StoreError> {
    let factions = sqlx::query("SELECT data FROM factions ORDER BY id")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| {
            let Json(faction): Json<Faction> = row.try_get("data")?;
            Ok(faction)
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    let lands = sqlx::query(
        "SELECT world, dimension, x, z, faction, owners FROM lands \
         ORDER BY world, dimension, x, z",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| {
        let key = LandKey::new(
            row.try_get("x")?,
            row.try_get("z")?,
            row.try_get::<String, _>("world")?,
            row.try_get("dimension")?,
        );
        let faction = FactionId::new(row.try_get("faction")?);
        let owners: Vec<String> = row.try_get("owners")?;
        Ok(Land::with_claim(key, faction, owners))
    })
    .collect::<Result<Vec<_>, sqlx::Error>>()?;

    let mut relations = Vec::new();
    for row in sqlx::query("SELECT one, two, kind FROM relations ORDER BY one, two")
        .fetch_all(pool)
        .await?
    {
        let kind: String = row.try_get("kind")?;
        let kind: RelationKind = kind.parse().map_err(StoreError::Corrupt)?;
        relations.push(Relation::new(
            kind,
            FactionId::new(row.try_get("one")?),
            FactionId::new(row.try_get("two")?),
        ));
    }

    tracing::info!(
        factions = factions.len(),
        lands = lands.len(),
        relations = relations.len(),
        "snapshot read from postgres"
    );
    Ok(LedgerSnapshot {
        factions,
        lands,
        relations,
    })
}
