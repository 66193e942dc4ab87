//! In-memory repositories for development and testing

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::domain::{
    DomainError, DomainResult, NewUser, RepositoryProvider, Reservation, ReservationRepository,
    ReservationStatus, UpdateReservationDto, UpdateUserDto, User, UserRepositoryInterface,
};

// ── Users ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, User>,
    /// email -> user id; the entry API makes the uniqueness check atomic
    emails: DashMap<String, String>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn username_taken(&self, username: &str, except_id: Option<&str>) -> bool {
        self.users
            .iter()
            .any(|u| u.username == username && Some(u.id.as_str()) != except_id)
    }
}

#[async_trait]
impl UserRepositoryInterface for InMemoryUserRepository {
    async fn create_user(&self, new_user: NewUser) -> DomainResult<User> {
        if self.username_taken(&new_user.username, None) {
            return Err(DomainError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        match self.emails.entry(new_user.email.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(DomainError::Conflict(
                    "Username or email already exists".to_string(),
                ));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(id.clone());
            }
        }

        let now = Utc::now();
        let user = User {
            id: id.clone(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let Some(id) = self.emails.get(email).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.value().clone()))
    }

    async fn count_users(&self) -> DomainResult<u64> {
        Ok(self.users.len() as u64)
    }

    async fn update_user(&self, id: &str, dto: UpdateUserDto) -> DomainResult<Option<User>> {
        // Scans `users`, so it has to run before the row is locked below.
        if let Some(username) = &dto.username {
            if self.username_taken(username, Some(id)) {
                return Err(DomainError::Conflict(
                    "Username or email already exists".to_string(),
                ));
            }
        }

        let Some(mut user) = self.users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(email) = &dto.email {
            match self.emails.entry(email.clone()) {
                dashmap::mapref::entry::Entry::Occupied(owner) if owner.get() != id => {
                    return Err(DomainError::Conflict(
                        "Username or email already exists".to_string(),
                    ));
                }
                dashmap::mapref::entry::Entry::Occupied(_) => {}
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(id.to_string());
                }
            }
        }

        if let Some(username) = dto.username {
            user.username = username;
        }
        if let Some(email) = dto.email {
            if email != user.email {
                self.emails.remove(&user.email);
            }
            user.email = email;
        }
        if let Some(role) = dto.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.value().clone()))
    }

    async fn update_user_password(
        &self,
        id: &str,
        new_password_hash: &str,
    ) -> DomainResult<Option<User>> {
        let Some(mut user) = self.users.get_mut(id) else {
            return Ok(None);
        };
        user.password_hash = new_password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(Some(user.value().clone()))
    }

    async fn delete_user(&self, id: &str) -> DomainResult<Option<User>> {
        let removed = self.users.remove(id).map(|(_, user)| user);
        if let Some(user) = &removed {
            self.emails.remove(&user.email);
        }
        Ok(removed)
    }
}

// ── Reservations ────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryReservationRepository {
    reservations: DashMap<String, Reservation>,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_where(&self, pred: impl Fn(&Reservation) -> bool) -> Vec<Reservation> {
        let mut found: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| r.value().clone())
            .collect();
        found.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));
        found
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn save(&self, reservation: Reservation) -> DomainResult<()> {
        self.reservations.insert(reservation.id.clone(), reservation);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>> {
        Ok(self.reservations.get(id).map(|r| r.value().clone()))
    }

    async fn find_all(&self) -> DomainResult<Vec<Reservation>> {
        let mut all = self.collect_where(|_| true);
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn find_by_user_id(&self, user_id: &str) -> DomainResult<Vec<Reservation>> {
        Ok(self.collect_where(|r| r.user_id == user_id))
    }

    async fn find_by_bike_id(&self, bike_id: &str) -> DomainResult<Vec<Reservation>> {
        Ok(self.collect_where(|r| r.bike_id == bike_id))
    }

    async fn find_by_status(&self, status: ReservationStatus) -> DomainResult<Vec<Reservation>> {
        Ok(self.collect_where(|r| r.status == status))
    }

    async fn update(
        &self,
        id: &str,
        dto: UpdateReservationDto,
    ) -> DomainResult<Option<Reservation>> {
        let Some(mut r) = self.reservations.get_mut(id) else {
            return Ok(None);
        };
        if let Some(bike_id) = dto.bike_id {
            r.bike_id = bike_id;
        }
        if let Some(starts_at) = dto.starts_at {
            r.starts_at = starts_at;
        }
        if let Some(ends_at) = dto.ends_at {
            r.ends_at = ends_at;
        }
        r.updated_at = Utc::now();
        Ok(Some(r.value().clone()))
    }

    async fn set_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> DomainResult<Option<Reservation>> {
        let Some(mut r) = self.reservations.get_mut(id) else {
            return Ok(None);
        };
        r.status = status;
        r.updated_at = Utc::now();
        Ok(Some(r.value().clone()))
    }

    async fn delete(&self, id: &str) -> DomainResult<bool> {
        Ok(self.reservations.remove(id).is_some())
    }
}

// ── Provider ────────────────────────────────────────────────────

/// Repository provider keeping everything in process memory
#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    users: InMemoryUserRepository,
    reservations: InMemoryReservationRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RepositoryProvider for InMemoryRepositoryProvider {
    fn users(&self) -> &dyn UserRepositoryInterface {
        &self.users
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    async fn ping(&self) -> DomainResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            role: UserRole::User,
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn email_is_unique() {
        let repo = InMemoryUserRepository::new();
        repo.create_user(new_user("a", "a@test.com")).await.unwrap();
        let err = repo.create_user(new_user("b", "a@test.com")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn changing_email_frees_the_old_one() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create_user(new_user("a", "a@test.com")).await.unwrap();
        repo.update_user(
            &user.id,
            UpdateUserDto {
                email: Some("new@test.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(repo.get_user_by_email("a@test.com").await.unwrap().is_none());
        assert_eq!(
            repo.get_user_by_email("new@test.com").await.unwrap().map(|u| u.id),
            Some(user.id)
        );
        repo.create_user(new_user("b", "a@test.com")).await.unwrap();
    }

    #[tokio::test]
    async fn updating_to_a_taken_email_conflicts() {
        let repo = InMemoryUserRepository::new();
        repo.create_user(new_user("a", "a@test.com")).await.unwrap();
        let b = repo.create_user(new_user("b", "b@test.com")).await.unwrap();
        let err = repo
            .update_user(
                &b.id,
                UpdateUserDto {
                    email: Some("a@test.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn updating_a_missing_user_reserves_nothing() {
        let repo = InMemoryUserRepository::new();
        let missing = repo
            .update_user(
                "no-such-id",
                UpdateUserDto {
                    email: Some("free@test.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(missing.is_none());
        assert!(repo.emails.get("free@test.com").is_none());
        repo.create_user(new_user("c", "free@test.com")).await.unwrap();
    }

    #[tokio::test]
    async fn reservations_filter_by_status() {
        let repo = InMemoryReservationRepository::new();
        let start = Utc::now();
        let r = Reservation::new("u", "b", start, start + chrono::Duration::hours(1));
        repo.save(r.clone()).await.unwrap();
        repo.set_status(&r.id, ReservationStatus::Rented).await.unwrap();

        assert_eq!(repo.find_by_status(ReservationStatus::Rented).await.unwrap().len(), 1);
        assert!(repo.find_by_status(ReservationStatus::Pending).await.unwrap().is_empty());
    }
}
