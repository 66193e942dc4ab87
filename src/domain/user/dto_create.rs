use super::UserRole;

/// Input for `UserService::create`. `password` is plain text; the service hashes it.
#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub username: String,
    pub email: String,
    pub role: Option<UserRole>,
    pub password: String,
}

/// Record handed to the repository once the password has been hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub password_hash: String,
}
