// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod ids;
pub mod list_store;
pub mod model;
pub mod mutation;
pub mod notification;
pub mod pagination;
pub mod selection;
pub mod session;
pub mod state;
pub mod store;

pub use ids::*;
pub use list_store::*;
pub use model::*;
pub use mutation::*;
pub use notification::*;
pub use pagination::{DEFAULT_PAGE_SIZE, PageView};
pub use selection::*;
pub use session::*;
pub use state::*;
pub use store::*;
