use crate::error::AppError;
use crate::model::{Entity, EntityId, EntityType};
use crate::query::{FilterExpr, OrderBy, Pagination};

/// Restricts a fetch to entities related to a parent batch.
#[derive(Clone, Debug, PartialEq)]
pub enum JoinFilter {
    /// Entities whose own id is in the list (to-one expansion through a foreign key).
    Ids(Vec<EntityId>),
    /// Entities pointing at one of the given `entity_type` ids, through `{type}_id` or `{type}_ids`.
    Related { entity_type: EntityType, ids: Vec<EntityId> },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchQuery {
    pub ids: Option<Vec<EntityId>>,
    pub join: Option<JoinFilter>,
    pub filter: Option<FilterExpr>,
    pub ordering: Vec<OrderBy>,
    pub pagination: Option<Pagination>,
    /// Set for fetches made on behalf of `$expand` or path resolution.
    pub expanded: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FetchResult {
    pub entities: Vec<Entity>,
    /// Number of matches before pagination.
    pub count: u64,
}

/// Storage seam. Entities cross it in internal form: snake_case keys, `id`, foreign keys and join lists.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn fetch(&self, entity_type: EntityType, query: &FetchQuery) -> Result<FetchResult, AppError>;
    async fn create(&self, entity_type: EntityType, body: Entity) -> Result<EntityId, AppError>;
    /// Merge `body` into an existing entity; `EntityNotFound` when the id is unknown.
    async fn update(&self, entity_type: EntityType, id: &EntityId, body: Entity) -> Result<(), AppError>;
    async fn delete(&self, entity_type: EntityType, id: &EntityId) -> Result<(), AppError>;
}
