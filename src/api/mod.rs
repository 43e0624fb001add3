//! HTTP surface: GraphQL endpoint, health probes and middleware

pub mod graphql;
pub mod middleware;
pub mod services;
