//! Token store and resolver.
//!
//! The store owns the token tree for one engine instance. It loads hierarchical token documents
//! through a [`TokenSource`], resolves `{dot.path}` references with explicit cycle detection,
//! reports structural problems, and applies token-domain fixes. Mutation happens only through
//! [`TokenStore::set`], [`TokenStore::delete`] and [`TokenStore::apply_fix`].

mod error;
mod export;
mod parse;
mod reference;
mod resolve;
mod source;
mod store;
mod token;
mod validate;
mod value;

pub use error::{ResolveError, StoreError};
pub use export::css_variable;
pub use reference::{Segment, is_valid_path, references, split_references};
pub use source::{FsTokenSource, InMemoryTokenSource, TokenDocument, TokenSource, tier_rank};
pub use store::{Override, TokenStore};
pub use token::{ResolvedToken, Token, TokenMeta};
pub use validate::{StructureIssue, StructureReport, codes};
pub use value::{infer_type, split_number_unit};
