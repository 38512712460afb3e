//! Infrastructure layer - cross-cutting concerns shared by the retrieval core.
//!
//! Only the pieces the engine itself depends on survive here: the shared
//! magic-number table used by `bm25`, `embedding`, `model_lifecycle`,
//! `hybrid_search`, `benchmark` and `domain::types`. Everything else the
//! teacher carried (auth, caching, rate limiting, admin web plumbing, ...)
//! belonged to the excluded CLI/HTTP/admin front-end and was dropped.

pub mod constants;
