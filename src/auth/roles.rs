// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Permission tiers, declared lowest first.
///
/// ## Role Hierarchy
///
/// - `Customer` - End user of a location
/// - `Staff` - Works at a location
/// - `LocationAdmin` - Manages a single location
/// - `SuperAdmin` - Manages every location
///
/// The derived `Ord` follows declaration order and is the only ordering
/// used for permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Lowest tier; also the fallback when no profile could be loaded
    Customer,
    /// Location staff member
    Staff,
    /// Administrator of one location
    LocationAdmin,
    /// Administrator of the whole organisation
    SuperAdmin,
}

/// Rank table, lowest first, in declaration order. Ranks start at 1.
///
/// This is the only place ranks are written down; [`Role::rank`] reads it.
pub const ROLE_RANKS: [(Role, u8); 4] = [
    (Role::Customer, 1),
    (Role::Staff, 2),
    (Role::LocationAdmin, 3),
    (Role::SuperAdmin, 4),
];

impl Role {
    /// All roles in ascending rank order.
    pub const ALL: [Role; 4] = [
        Role::Customer,
        Role::Staff,
        Role::LocationAdmin,
        Role::SuperAdmin,
    ];

    /// The lowest-ranked role.
    pub const LOWEST: Role = Role::Customer;

    /// Numeric rank of this role (see [`ROLE_RANKS`]).
    pub const fn rank(self) -> u8 {
        ROLE_RANKS[self as usize].1
    }

    /// Check if this role has at least the privileges of the required role.
    pub fn has_privilege(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// Wire value, as stored in the profile table.
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Staff => "staff",
            Role::LocationAdmin => "location_admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Human-readable label for toolbars and notices.
    pub const fn label(self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Staff => "Staff",
            Role::LocationAdmin => "Location Admin",
            Role::SuperAdmin => "Super Admin",
        }
    }
}

impl Default for Role {
    /// Default role is Customer (least privilege).
    fn default() -> Self {
        Role::LOWEST
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role string that is not one of the known tiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Parse role from string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "staff" => Ok(Role::Staff),
            "location_admin" => Ok(Role::LocationAdmin),
            "super_admin" => Ok(Role::SuperAdmin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_match_table() {
        for (role, rank) in ROLE_RANKS {
            assert_eq!(role.rank(), rank);
        }
    }

    #[test]
    fn rank_table_follows_declaration_order() {
        for (index, (role, _)) in ROLE_RANKS.iter().enumerate() {
            assert_eq!(*role as usize, index);
            assert_eq!(Role::ALL[index], *role);
        }
        assert_eq!(Role::Customer.rank(), 1);
        assert_eq!(Role::SuperAdmin.rank(), 4);
    }

    #[test]
    fn ordering_is_total_and_ascending() {
        assert!(Role::Customer < Role::Staff);
        assert!(Role::Staff < Role::LocationAdmin);
        assert!(Role::LocationAdmin < Role::SuperAdmin);

        let mut shuffled = [
            Role::SuperAdmin,
            Role::Customer,
            Role::LocationAdmin,
            Role::Staff,
        ];
        shuffled.sort();
        assert_eq!(shuffled, Role::ALL);
    }

    #[test]
    fn super_admin_has_all_privileges() {
        for role in Role::ALL {
            assert!(Role::SuperAdmin.has_privilege(role));
        }
    }

    #[test]
    fn customer_only_has_customer_privilege() {
        assert!(Role::Customer.has_privilege(Role::Customer));
        assert!(!Role::Customer.has_privilege(Role::Staff));
        assert!(!Role::Customer.has_privilege(Role::LocationAdmin));
        assert!(!Role::Customer.has_privilege(Role::SuperAdmin));
    }

    #[test]
    fn from_str_parses_correctly() {
        assert_eq!("staff".parse::<Role>(), Ok(Role::Staff));
        assert_eq!("LOCATION_ADMIN".parse::<Role>(), Ok(Role::LocationAdmin));
        assert_eq!(" super_admin ".parse::<Role>(), Ok(Role::SuperAdmin));
        assert_eq!(
            "owner".parse::<Role>(),
            Err(UnknownRole("owner".to_string()))
        );
    }

    #[test]
    fn display_and_serde_use_wire_value() {
        assert_eq!(Role::LocationAdmin.to_string(), "location_admin");
        assert_eq!(
            serde_json::to_string(&Role::SuperAdmin).unwrap(),
            "\"super_admin\""
        );
        let parsed: Role = serde_json::from_str("\"staff\"").unwrap();
        assert_eq!(parsed, Role::Staff);
    }

    #[test]
    fn labels_are_human_readable() {
        assert_eq!(Role::SuperAdmin.label(), "Super Admin");
        assert_eq!(Role::Customer.label(), "Customer");
    }

    #[test]
    fn default_role_is_customer() {
        assert_eq!(Role::default(), Role::Customer);
    }
}
