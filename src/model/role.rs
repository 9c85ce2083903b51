use strum_macros::{Display, EnumString};

/// Roles are stored by id on the user row; settings refer to them by name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, EnumString)]
pub enum Role {
    #[strum(to_string = "Admin", serialize = "System Manager")]
    Admin = 1,
    #[strum(to_string = "HR Manager", serialize = "HR")]
    Hr = 2,
    #[strum(serialize = "Employee")]
    Employee = 3,
    #[strum(serialize = "System")]
    System = 4,
    #[strum(serialize = "API User")]
    ApiUser = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::System),
            5 => Some(Role::ApiUser),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_role_names_from_settings() {
        assert_eq!(Role::from_str("HR Manager").unwrap(), Role::Hr);
        assert_eq!(Role::from_str("System Manager").unwrap(), Role::Admin);
        assert!(Role::from_str("Accounts User").is_err());
    }

    #[test]
    fn id_round_trips() {
        for role in [Role::Admin, Role::Hr, Role::Employee, Role::System, Role::ApiUser] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(9), None);
    }
}
