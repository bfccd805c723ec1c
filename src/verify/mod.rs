//! Verification primitives
//!
//! The status lattice, the recursive verification tree, and the matcher,
//! predicate, and description layers that turn extracted values into
//! pass/fail outcomes.

pub mod description;
pub mod matcher;
pub mod predicate;
pub mod response;
pub mod status;
pub mod verification;

pub use description::Description;
pub use matcher::{CombinatorOp, Matcher, MatcherFactory, StaticOp, ValueOp};
pub use predicate::Predicate;
pub use response::{BodyDescription, ResponseDescription, ResponseVerification};
pub use status::{Status, Statused, StatusedList};
pub use verification::Verification;
