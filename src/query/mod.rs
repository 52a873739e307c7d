//! Query-retrieve-compose pipeline.
//!
//! ```text
//! request body ──▶ QueryService ──▶ Retriever ──▶ ResponseComposer ──▶ payload
//!                  (validate,        (embed, search,  (echo / evidence /
//!                   map errors)       batch lookup,    summary)
//!                                     re-order)
//! ```

mod composer;
mod retriever;
mod service;

pub use composer::{ResponseComposer, EVIDENCE_MARKER, QUERY_MARKER, SUMMARY_LINE};
pub use retriever::{RetrievalResult, Retriever};
pub use service::{Query, QueryLimits, QueryReply, QueryService, ResponsePayload};
