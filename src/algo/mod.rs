pub mod corpus;
pub mod nmf;
pub mod report;
pub mod topics;
pub mod vocabulary;
