use core::str::FromStr;

use serde::{Deserialize, Serialize};

use bazaar_core::DomainError;

/// The capability tag carried by every account.
///
/// Sellers manage a store and its inventory, customers buy, and operational
/// staff onboard sellers and run warehouses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Seller,
    Customer,
    OperationalGuy,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Seller, Role::Customer, Role::OperationalGuy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Seller => "seller",
            Role::Customer => "customer",
            Role::OperationalGuy => "operational_guy",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DomainError::validation("role must be one of: seller, customer, operational_guy")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Seller".parse::<Role>().unwrap(), Role::Seller);
        assert_eq!(" operational_guy ".parse::<Role>().unwrap(), Role::OperationalGuy);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }
}
