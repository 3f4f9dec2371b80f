//! Opaque handles for hosts that cannot hold a [`User`] directly

use crate::coefficients::PhysiologyCoefficients;
use crate::error::Result;
use crate::profile::UserProfileParams;
use crate::user::User;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// Handle to a registered user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserHandle(Uuid);

impl UserHandle {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for UserHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner of every live user
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: HashMap<UserHandle, User>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_default(&mut self) -> UserHandle {
        self.insert(User::new())
    }

    pub fn create_with(&mut self, params: UserProfileParams) -> UserHandle {
        self.insert(User::with_profile(params))
    }

    pub fn create_with_coefficients(
        &mut self,
        params: UserProfileParams,
        coefficients: PhysiologyCoefficients,
    ) -> Result<UserHandle> {
        Ok(self.insert(User::with_coefficients(params, coefficients)?))
    }

    /// Drop a user; false when the handle is unknown
    pub fn destroy(&mut self, handle: UserHandle) -> bool {
        let removed = self.users.remove(&handle).is_some();
        if removed {
            info!(%handle, "User destroyed");
        }
        removed
    }

    pub fn get(&self, handle: UserHandle) -> Option<&User> {
        self.users.get(&handle)
    }

    pub fn get_mut(&mut self, handle: UserHandle) -> Option<&mut User> {
        self.users.get_mut(&handle)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = UserHandle> + '_ {
        self.users.keys().copied()
    }

    fn insert(&mut self, user: User) -> UserHandle {
        let handle = UserHandle(Uuid::new_v4());
        self.users.insert(handle, user);
        info!(%handle, users = self.users.len(), "User created");
        handle
    }
}
