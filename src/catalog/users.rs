use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::order::Role;

/// The slice of a user profile the ordering core needs
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserContact {
    pub id: Uuid,
    pub phone: String,
    pub role: Role,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, user_id: Uuid) -> anyhow::Result<Option<UserContact>>;
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Uuid, UserContact>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, phone: impl Into<String>, role: Role) -> UserContact {
        let user = UserContact {
            id: Uuid::new_v4(),
            phone: phone.into(),
            role,
        };
        self.users.write().await.insert(user.id, user.clone());
        user
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, user_id: Uuid) -> anyhow::Result<Option<UserContact>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }
}
