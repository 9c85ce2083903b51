use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::{HrError, HrResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum EmployeeStatus {
    Active,
    Inactive,
    Suspended,
    Left,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "company": "Acme GmbH",
        "status": "Active",
        "date_of_joining": "2019-03-01",
        "relieving_date": null,
        "holiday_list_id": 1,
        "leave_approver": "jane.roe@acme.test",
        "user_id": "john.doe@acme.test",
        "personal_email": null,
        "company_email": "john.doe@acme.test",
        "image": null,
        "permanent": true
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "Acme GmbH")]
    pub company: String,

    #[schema(example = "Active")]
    pub status: String,

    #[schema(example = "2019-03-01", value_type = String, format = "date")]
    pub date_of_joining: NaiveDate,

    #[schema(value_type = Option<String>, format = "date", nullable = true)]
    pub relieving_date: Option<NaiveDate>,

    pub holiday_list_id: Option<u64>,

    /// Login email of the approver
    pub leave_approver: Option<String>,

    /// Login email of the linked user
    pub user_id: Option<String>,

    pub personal_email: Option<String>,

    pub company_email: Option<String>,

    pub image: Option<String>,

    pub permanent: bool,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active.as_ref()
    }

    /// Preferred address for notifications: user id, then personal, then company email.
    pub fn preferred_email(&self) -> Option<&str> {
        [&self.user_id, &self.personal_email, &self.company_email]
            .into_iter()
            .filter_map(|e| e.as_deref())
            .find(|e| !e.trim().is_empty())
    }
}

pub const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, company, status, \
    date_of_joining, relieving_date, holiday_list_id, leave_approver, user_id, personal_email, \
    company_email, image, permanent";

pub async fn fetch_employee(pool: &MySqlPool, employee_id: u64) -> HrResult<Employee> {
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
    sqlx::query_as::<_, Employee>(&sql)
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| HrError::NotFound(format!("Employee {} not found", employee_id)))
}

/// Fetches the employee and rejects anyone who is not active.
pub async fn fetch_active_employee(pool: &MySqlPool, employee_id: u64) -> HrResult<Employee> {
    let employee = fetch_employee(pool, employee_id).await?;
    if !employee.is_active() {
        return Err(HrError::Validation(format!(
            "{} is not active",
            employee.employee_code
        )));
    }
    Ok(employee)
}

pub async fn active_employee_ids(pool: &MySqlPool) -> HrResult<Vec<u64>> {
    let ids = sqlx::query_scalar::<_, u64>(
        "SELECT id FROM employees WHERE status = 'Active' ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

#[cfg(test)]
pub(crate) fn sample_employee(id: u64, company: &str) -> Employee {
    Employee {
        id,
        employee_code: format!("EMP-{:03}", id),
        first_name: format!("First{}", id),
        last_name: "Tester".to_string(),
        company: company.to_string(),
        status: "Active".to_string(),
        date_of_joining: NaiveDate::from_ymd_opt(2020, 5, 4).unwrap(),
        relieving_date: None,
        holiday_list_id: None,
        leave_approver: None,
        user_id: None,
        personal_email: None,
        company_email: None,
        image: None,
        permanent: false,
    }
}
