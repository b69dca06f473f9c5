pub mod documents;
pub mod graph;
pub mod query;

pub use documents::document_routes;
pub use graph::graph_routes;
pub use query::query_routes;
