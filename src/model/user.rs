use crate::auth::jwt::TokenSubject;

/// Login account. `email` is what employees reference as `user_id` and
/// `leave_approver`.
#[derive(Debug, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub role_id: u8,
    pub employee_id: Option<u64>,
    pub is_active: bool,
}

impl From<&User> for TokenSubject {
    fn from(user: &User) -> Self {
        TokenSubject {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role_id,
            employee_id: user.employee_id,
        }
    }
}
