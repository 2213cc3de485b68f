pub mod related_documents;

pub use related_documents::{
    RankRelatedDocuments, RankingError, RankingResult, RankingSummary, DEFAULT_RELATED_LIMIT,
    MAX_RELATED_LIMIT,
};
