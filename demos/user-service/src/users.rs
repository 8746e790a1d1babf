//! The `/users` resource

use sleepy::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Model)]
#[serde(default)]
pub struct User {
    #[sleepy(readonly)]
    pub id: String,
    #[sleepy(required)]
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[sleepy(required)]
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[sleepy(required)]
    pub email: String,
    #[sleepy(required, writeonly)]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
}

/// In-memory user storage
#[derive(Clone, Default)]
pub struct UserStore {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl UserStore {
    async fn get(&self, id: &str) -> Option<User> {
        self.users.read().await.get(id).cloned()
    }

    async fn insert(&self, mut user: User) -> User {
        user.id = uuid::Uuid::new_v4().to_string();
        self.users
            .write()
            .await
            .insert(user.id.clone(), user.clone());
        user
    }
}

/// Require a bearer token and record it as the principal
fn has_auth(req: &Request, data: &mut CallData) -> Result<()> {
    let token = req
        .header("authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Please login."))?;
    data.set_principal(token);
    Ok(())
}

pub fn resource(store: UserStore) -> Resource {
    let mut users = Resource::new("/users");

    let lookup = store.clone();
    users
        .route("/{uid}")
        .method(Method::GET)
        .to(move |req: Request, _data: CallData| {
            let store = lookup.clone();
            async move {
                let uid = req.path_param("uid").unwrap_or_default();
                store
                    .get(uid)
                    .await
                    .ok_or_else(|| ApiError::not_found("User not found."))
            }
        })
        .operation_name("getUser")
        .path_param("uid", "ID of the user to search for.")
        .returns::<User>();

    users
        .route("")
        .method(Method::POST)
        .to(move |_req: Request, mut data: CallData| {
            let store = store.clone();
            async move {
                let user = data
                    .take_body::<User>()
                    .ok_or_else(|| ApiError::internal("createUser ran without a decoded body"))?;
                if let Some(principal) = data.principal() {
                    info!(principal = %principal.0, email = %user.email, "Creating user");
                }
                Ok::<_, ApiError>(store.insert(user).await)
            }
        })
        .filter(has_auth)
        .operation_name("createUser")
        .reads::<User>()
        .returns::<User>();

    users
}
