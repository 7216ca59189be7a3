//! Language and framework identifiers
//!
//! Both sets are closed: detection can only ever report one of the variants below.

pub mod framework_id;
pub mod id_enum_macro;
pub mod language_id;

pub use framework_id::FrameworkId;
pub use language_id::LanguageId;
