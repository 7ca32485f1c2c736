pub mod entity;
pub mod executor;
pub mod introspect;
pub mod manager;
pub mod naming;
pub mod registry;

pub use entity::Entity;
pub use executor::{JsonRow, QueryExecutor, SqlParam};
pub use introspect::{FieldType, SchemaIntrospector};
pub use manager::{DatabaseError, DatabaseManager};
pub use naming::{SuffixResolver, TableName, TableResolver};
pub use registry::{ColumnDef, ColumnInfo, ColumnSource, StaticColumns};
