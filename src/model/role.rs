#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Employee,
    Manager,
}

impl Role {
    pub fn from_str(role: &str) -> Option<Self> {
        match role {
            "employee" => Some(Role::Employee),
            "manager" => Some(Role::Manager),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Manager => "manager",
        }
    }

    /// Display-code prefix used when assigning employee codes (EMP001, MGR001).
    pub fn code_prefix(&self) -> &'static str {
        match self {
            Role::Employee => "EMP",
            Role::Manager => "MGR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!(Role::from_str("employee"), Some(Role::Employee));
        assert_eq!(Role::from_str("manager"), Some(Role::Manager));
        assert_eq!(Role::from_str("admin"), None);
        assert_eq!(Role::from_str("Employee"), None);
    }

    #[test]
    fn round_trips_as_str() {
        for role in [Role::Employee, Role::Manager] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
    }
}
