use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

use crate::error::{HrError, HrResult};
use crate::model::role::Role;

/// The caller as established by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("Missing token")),
        )
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> HrResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(HrError::Forbidden("Admin only".to_string()))
        }
    }

    pub fn require_hr_or_admin(&self) -> HrResult<()> {
        if self.is_hr_or_admin() {
            Ok(())
        } else {
            Err(HrError::Forbidden("HR/Admin only".to_string()))
        }
    }

    pub fn is_hr_or_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Hr)
    }

    pub fn own_employee_id(&self) -> HrResult<u64> {
        self.employee_id
            .ok_or_else(|| HrError::Forbidden("No employee profile".to_string()))
    }

    /// HR and admins may act for anyone; everyone else only for themselves.
    pub fn require_self_or_hr(&self, employee_id: u64) -> HrResult<()> {
        if self.is_hr_or_admin() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(HrError::Forbidden("Not allowed for this employee".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "u".into(),
            role,
            employee_id,
        }
    }

    #[test]
    fn employees_act_only_for_themselves() {
        let me = user(Role::Employee, Some(5));
        assert!(me.require_self_or_hr(5).is_ok());
        assert!(me.require_self_or_hr(6).is_err());
        assert!(me.require_hr_or_admin().is_err());
        assert!(user(Role::Hr, None).require_self_or_hr(6).is_ok());
    }

    #[test]
    fn own_employee_id_needs_a_profile() {
        assert!(user(Role::Admin, None).own_employee_id().is_err());
        assert_eq!(user(Role::Employee, Some(3)).own_employee_id().unwrap(), 3);
    }

    #[actix_web::test]
    async fn extractor_reads_user_set_by_middleware() {
        let req = TestRequest::default().to_http_request();
        assert!(AuthUser::extract(&req).await.is_err());

        req.extensions_mut().insert(user(Role::Hr, Some(9)));
        let extracted = AuthUser::extract(&req).await.unwrap();
        assert_eq!(extracted.role, Role::Hr);
        assert_eq!(extracted.employee_id, Some(9));
    }
}
