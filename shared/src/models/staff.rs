//! Staff Model

use serde::{Deserialize, Serialize};

/// Staff role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    Admin,
    Manager,
    Driver,
}

/// Staff member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: i64,
    pub username: String,
    pub role: StaffRole,
    pub is_active: bool,
}

impl Staff {
    pub fn is_driver(&self) -> bool {
        self.role == StaffRole::Driver && self.is_active
    }
}
