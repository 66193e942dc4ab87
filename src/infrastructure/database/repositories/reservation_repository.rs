//! SeaORM implementation of ReservationRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use crate::domain::reservation::{
    Reservation, ReservationRepository, ReservationStatus, UpdateReservationDto,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::reservation;

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, id: &str) -> DomainResult<Option<reservation::Model>> {
        reservation::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: reservation::Model) -> DomainResult<Reservation> {
    Ok(Reservation {
        status: m.status.parse()?,
        id: m.id,
        user_id: m.user_id,
        bike_id: m.bike_id,
        starts_at: m.starts_at,
        ends_at: m.ends_at,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn models_to_domain(models: Vec<reservation::Model>) -> DomainResult<Vec<Reservation>> {
    models.into_iter().map(model_to_domain).collect()
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn save(&self, r: Reservation) -> DomainResult<()> {
        debug!("Saving reservation: {}", r.id);

        let model = reservation::ActiveModel {
            id: Set(r.id),
            user_id: Set(r.user_id),
            bike_id: Set(r.bike_id),
            starts_at: Set(r.starts_at),
            ends_at: Set(r.ends_at),
            status: Set(r.status.as_str().to_string()),
            created_at: Set(r.created_at),
            updated_at: Set(r.updated_at),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>> {
        self.find_model(id).await?.map(model_to_domain).transpose()
    }

    async fn find_all(&self) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .order_by_asc(reservation::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }

    async fn find_by_user_id(&self, user_id: &str) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(user_id))
            .order_by_asc(reservation::Column::StartsAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }

    async fn find_by_bike_id(&self, bike_id: &str) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::BikeId.eq(bike_id))
            .order_by_asc(reservation::Column::StartsAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }

    async fn find_by_status(&self, status: ReservationStatus) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::Status.eq(status.as_str()))
            .order_by_asc(reservation::Column::StartsAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }

    async fn update(
        &self,
        id: &str,
        dto: UpdateReservationDto,
    ) -> DomainResult<Option<Reservation>> {
        debug!("Updating reservation: {}", id);

        let Some(existing) = self.find_model(id).await? else {
            return Ok(None);
        };

        let mut active: reservation::ActiveModel = existing.into();
        if let Some(bike_id) = dto.bike_id {
            active.bike_id = Set(bike_id);
        }
        if let Some(starts_at) = dto.starts_at {
            active.starts_at = Set(starts_at);
        }
        if let Some(ends_at) = dto.ends_at {
            active.ends_at = Set(ends_at);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await.map_err(db_err)?;
        model_to_domain(updated).map(Some)
    }

    async fn set_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> DomainResult<Option<Reservation>> {
        let Some(existing) = self.find_model(id).await? else {
            return Ok(None);
        };

        let mut active: reservation::ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await.map_err(db_err)?;
        model_to_domain(updated).map(Some)
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        let result = reservation::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::{init_database_with_migrations, DatabaseConfig};
    use chrono::Duration;

    async fn repo() -> SeaOrmReservationRepository {
        let db = init_database_with_migrations(&DatabaseConfig::in_memory())
            .await
            .unwrap();
        SeaOrmReservationRepository::new(db)
    }

    fn reservation(user_id: &str, bike_id: &str) -> Reservation {
        let start = Utc::now() + Duration::hours(1);
        Reservation::new(user_id, bike_id, start, start + Duration::hours(3))
    }

    #[tokio::test]
    async fn save_and_find_by_foreign_keys() {
        let repo = repo().await;
        let a = reservation("user-1", "bike-1");
        let b = reservation("user-1", "bike-2");
        let c = reservation("user-2", "bike-1");
        for r in [&a, &b, &c] {
            repo.save(r.clone()).await.unwrap();
        }

        let found = repo.find_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(found.bike_id, "bike-1");
        assert_eq!(found.status, ReservationStatus::Pending);

        assert_eq!(repo.find_all().await.unwrap().len(), 3);
        assert_eq!(repo.find_by_user_id("user-1").await.unwrap().len(), 2);
        assert_eq!(repo.find_by_bike_id("bike-1").await.unwrap().len(), 2);
        assert!(repo.find_by_user_id("user-3").await.unwrap().is_empty());
        assert_eq!(repo.find_by_id("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_status_persists() {
        let repo = repo().await;
        let r = reservation("user-1", "bike-1");
        repo.save(r.clone()).await.unwrap();

        let rented = repo
            .set_status(&r.id, ReservationStatus::Rented)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rented.status, ReservationStatus::Rented);

        let present = repo.find_by_status(ReservationStatus::Rented).await.unwrap();
        assert_eq!(present.len(), 1);
        assert_eq!(present[0].id, r.id);

        assert_eq!(
            repo.set_status("missing", ReservationStatus::Rented).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn update_overwrites_given_fields_only() {
        let repo = repo().await;
        let r = reservation("user-1", "bike-1");
        repo.save(r.clone()).await.unwrap();

        let updated = repo
            .update(
                &r.id,
                UpdateReservationDto {
                    bike_id: Some("bike-9".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.bike_id, "bike-9");
        assert_eq!(updated.starts_at.timestamp(), r.starts_at.timestamp());
        assert_eq!(updated.user_id, "user-1");

        assert_eq!(
            repo.update("missing", UpdateReservationDto::default()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let repo = repo().await;
        let r = reservation("user-1", "bike-1");
        repo.save(r.clone()).await.unwrap();

        assert!(repo.delete(&r.id).await.unwrap());
        assert!(!repo.delete(&r.id).await.unwrap());
        assert_eq!(repo.find_by_id(&r.id).await.unwrap(), None);
    }
}
