//! Domain model of the signing workflow: parameter enumerations, crypto
//! value types, documents, the session record and the request contract.

pub mod contract;
pub mod crypto;
pub mod document;
pub mod params;
pub mod session;
