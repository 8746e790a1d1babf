//! # Sleepy
//!
//! Declarative REST call handlers for Rust.
//!
//! A resource declares its calls through a fluent builder: path, method,
//! handler, filters and the models it reads and returns. Sleepy decodes and
//! validates request bodies against the model's `#[sleepy(...)]`
//! annotations, runs filters at the API, resource and call level, scrubs
//! write-only fields from responses and logs exactly one line per request.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sleepy::prelude::*;
//!
//! #[derive(Default, Serialize, Deserialize, Model)]
//! #[serde(default)]
//! struct User {
//!     #[sleepy(readonly)]
//!     id: String,
//!     #[sleepy(required)]
//!     name: String,
//!     #[sleepy(required, writeonly)]
//!     password: String,
//! }
//!
//! async fn create_user(_req: Request, mut data: CallData) -> Result<User> {
//!     let mut user = data.take_body::<User>().ok_or_else(|| ApiError::internal("no body"))?;
//!     user.id = "42".into();
//!     Ok(user)
//! }
//!
//! #[sleepy::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     init_tracing();
//!
//!     let mut users = Resource::new("/users");
//!     users
//!         .route("")
//!         .method(Method::POST)
//!         .to(create_user)
//!         .operation_name("createUser")
//!         .reads::<User>()
//!         .returns::<User>();
//!
//!     let mut api = Api::with_config(ApiConfig::from_env()?);
//!     api.register(users)?;
//!     api.serve("127.0.0.1:3000").await?;
//!     Ok(())
//! }
//! ```

// Re-export core functionality
pub use sleepy_core::*;

// Re-export macros
pub use sleepy_macros::*;

pub use http;

/// Prelude module - import everything you need with `use sleepy::prelude::*`
pub mod prelude {
    pub use sleepy_core::{
        init_tracing,
        Api,
        ApiConfig,
        // Error handling
        ApiError,
        CallData,
        CorsConfig,
        Environment,
        ErrorKind,
        // Schema
        Model,
        Principal,
        RegistrationError,
        Reply,
        Request,
        Resource,
        Response,
        Result,
    };

    pub use sleepy_macros::Model;

    pub use http::{Method, StatusCode};

    // Re-export commonly used external types
    pub use serde::{Deserialize, Serialize};
    pub use tracing::{debug, error, info, trace, warn};
}
