use super::UserRole;

/// Partial overwrite of a user. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserDto {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

impl UpdateUserDto {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.role.is_none()
    }
}
