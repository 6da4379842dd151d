pub mod corpus;
pub mod features;
pub mod poster;
pub mod recommendation;
pub mod resolver;
pub mod serving;
pub mod snapshot;
