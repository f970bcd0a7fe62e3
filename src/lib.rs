//! SensorThings SDK: OGC SensorThings API query engine, expansion, data arrays and nested paths
//! over a pluggable backend, served through axum.

pub mod case;
pub mod config;
pub mod data_array;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod links;
pub mod model;
pub mod query;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

pub use config::{load_from_env, load_from_file, load_from_json, IdType, Settings};
pub use data_array::{from_data_array, selected_fields, to_data_array, DataArrayBatch, DataArrayGroup, ObservationField};
pub use engine::{DeleteObservationsBody, ListScope, NestedResolution, ResourcePath, SensorThingsEngine};
pub use error::{AppError, ConfigError};
pub use links::LinkBuilder;
pub use model::{relations_of, relations_of_name, Entity, EntityId, EntityType, Relation};
pub use query::{parse_expand, parse_filter, ExpansionPlan, QueryOptions};
pub use response::{entity_to_wire, EntityPage, ListResponse};
pub use routes::{common_routes, common_routes_with_ready, sensorthings_routes};
pub use state::AppState;
pub use store::{Backend, FetchQuery, FetchResult, JoinFilter, MemoryBackend};
