use sqlx::PgPool;
use sqlx::types::Json;

use super::copy::enum_str;
use crate::error::StoreError;
use crate::id::FactionId;
use crate::model::{Faction, Land, LandKey, Relation};
use crate::persist::LedgerStore;

/// Row-at-a-time writes against the tables created by [`super::migrate`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl LedgerStore for PgStore {
    async fn save_land(&self, land: &Land) -> Result<(), StoreError> {
        let key = land.key();
        sqlx::query(
            "INSERT INTO lands (world, dimension, x, z, faction, owners) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (world, dimension, x, z) \
             DO UPDATE SET faction = EXCLUDED.faction, owners = EXCLUDED.owners",
        )
        .bind(&key.world)
        .bind(key.dimension)
        .bind(key.x)
        .bind(key.z)
        .bind(land.claimer_id().as_i32())
        .bind(land.owners())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_land(&self, key: &LandKey) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM lands WHERE world = $1 AND dimension = $2 AND x = $3 AND z = $4")
            .bind(&key.world)
            .bind(key.dimension)
            .bind(key.x)
            .bind(key.z)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_faction(&self, faction: &Faction) -> Result<(), StoreError> {
        let kind = enum_str(&faction.kind())?;
        sqlx::query(
            "INSERT INTO factions (id, name, kind, data) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) \
             DO UPDATE SET name = EXCLUDED.name, kind = EXCLUDED.kind, data = EXCLUDED.data",
        )
        .bind(faction.id().as_i32())
        .bind(faction.name())
        .bind(kind)
        .bind(Json(faction))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_faction(&self, id: FactionId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM factions WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_relation(&self, relation: &Relation) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO relations (one, two, kind) VALUES ($1, $2, $3) \
             ON CONFLICT (one, two) DO UPDATE SET kind = EXCLUDED.kind",
        )
        .bind(relation.one().as_i32())
        .bind(relation.two().as_i32())
        .bind(relation.kind.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_relation(&self, one: FactionId, two: FactionId) -> Result<(), StoreError> {
        let (one, two) = crate::model::canonical_pair(one, two);
        sqlx::query("DELETE FROM relations WHERE one = $1 AND two = $2")
            .bind(one.as_i32())
            .bind(two.as_i32())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
