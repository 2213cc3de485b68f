use crate::domain::{
    aggregates::Document,
    base::{DomainError, Entity},
    value_objects::{DocumentId, LinkRewriter, RelatedLink},
};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use thiserror::Error;
use tracing::debug;

/// Most related documents ever recorded for one document
pub const MAX_RELATED_LIMIT: usize = 3;

/// Number of related documents recorded per document
pub const DEFAULT_RELATED_LIMIT: usize = MAX_RELATED_LIMIT;

#[derive(Error, Debug)]
pub enum RankingError {
    #[error("Document {0} has no embedding")]
    MissingEmbedding(DocumentId),

    #[error("failed to compute similarity for {subject} and {candidate}: {source}")]
    Similarity {
        subject: DocumentId,
        candidate: DocumentId,
        #[source]
        source: DomainError,
    },
}

pub type RankingResult<T> = Result<T, RankingError>;

/// Outcome of a ranking pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RankingSummary {
    pub documents_ranked: usize,
    /// Documents whose related list differs from what they had before
    pub changed: Vec<DocumentId>,
}

impl RankingSummary {
    pub fn documents_changed(&self) -> usize {
        self.changed.len()
    }
}

/// Use case for computing the related documents of every document
///
/// Each document is compared by cosine similarity against every eligible
/// candidate (published, not scheduled after `now`, not itself). The best
/// scores win; equal scores are ordered by candidate identifier so the
/// output is reproducible. Neighbour lists are all computed before any is
/// assigned, so a failing comparison leaves every document untouched.
pub struct RankRelatedDocuments {
    limit: usize,
    now: DateTime<Utc>,
    rewriter: LinkRewriter,
}

impl RankRelatedDocuments {
    /// Rank against the current wall-clock time
    pub fn new(rewriter: LinkRewriter) -> Self {
        Self::at(rewriter, Utc::now())
    }

    /// Rank as if the current time were `now`
    pub fn at(rewriter: LinkRewriter, now: DateTime<Utc>) -> Self {
        Self {
            limit: DEFAULT_RELATED_LIMIT,
            now,
            rewriter,
        }
    }

    /// Lower the number of related documents; capped at `MAX_RELATED_LIMIT`
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.min(MAX_RELATED_LIMIT);
        self
    }

    pub fn execute(&self, documents: &mut [Document]) -> RankingResult<RankingSummary> {
        let neighbours = documents
            .iter()
            .map(|subject| self.nearest_neighbours(subject, documents))
            .collect::<RankingResult<Vec<_>>>()?;

        let mut summary = RankingSummary::default();
        for (document, links) in documents.iter_mut().zip(neighbours) {
            if document.set_related(&links) {
                debug!("Related posts changed for {}", document.id());
                summary.changed.push(document.id().clone());
            }
            summary.documents_ranked += 1;
        }

        Ok(summary)
    }

    /// Top related links for one subject, best first
    fn nearest_neighbours(
        &self,
        subject: &Document,
        documents: &[Document],
    ) -> RankingResult<Vec<RelatedLink>> {
        let subject_embedding = subject
            .embedding()
            .ok_or_else(|| RankingError::MissingEmbedding(subject.id().clone()))?;

        let mut scored: Vec<(&DocumentId, f64)> = Vec::with_capacity(documents.len());
        for candidate in documents
            .iter()
            .filter(|c| c.is_eligible_candidate_for(subject, self.now))
        {
            let candidate_embedding = candidate
                .embedding()
                .ok_or_else(|| RankingError::MissingEmbedding(candidate.id().clone()))?;

            let score = subject_embedding
                .cosine_similarity(candidate_embedding)
                .map_err(|source| RankingError::Similarity {
                    subject: subject.id().clone(),
                    candidate: candidate.id().clone(),
                    source,
                })?;

            scored.push((candidate.id(), score));
        }

        scored.sort_by(|(a_id, a_score), (b_id, b_score)| {
            match b_score.total_cmp(a_score) {
                Ordering::Equal => a_id.cmp(b_id),
                ordering => ordering,
            }
        });
        scored.truncate(self.limit);

        Ok(scored
            .into_iter()
            .map(|(id, _)| self.rewriter.rewrite(id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        front_matter::FrontMatter,
        value_objects::{Embedding, PublishDate},
    };
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn doc(name: &str, front_matter: FrontMatter, embedding: &[f64]) -> Document {
        let mut document = Document::new(
            DocumentId::new(format!("content/posts/{}/index.md", name)).unwrap(),
            front_matter,
            "",
        );
        document
            .set_embedding(Embedding::new(embedding.to_vec()).unwrap())
            .unwrap();
        document
    }

    fn ranker() -> RankRelatedDocuments {
        RankRelatedDocuments::at(LinkRewriter::default(), now())
    }

    #[test]
    fn test_orders_by_descending_similarity() {
        let mut docs = vec![
            doc("subject", FrontMatter::new(), &[1.0, 0.0]),
            doc("far", FrontMatter::new(), &[-1.0, 0.1]),
            doc("near", FrontMatter::new(), &[1.0, 0.1]),
            doc("middle", FrontMatter::new(), &[0.5, 0.5]),
        ];

        ranker().execute(&mut docs).unwrap();

        assert_eq!(
            docs[0].related(),
            &[
                "/posts/near".to_string(),
                "/posts/middle".to_string(),
                "/posts/far".to_string()
            ]
        );
    }

    #[test]
    fn test_limits_to_three() {
        let mut docs: Vec<Document> = (0..6)
            .map(|i| doc(&format!("p{}", i), FrontMatter::new(), &[1.0, i as f64]))
            .collect();

        let summary = ranker().execute(&mut docs).unwrap();

        assert_eq!(summary.documents_ranked, 6);
        for d in &docs {
            assert_eq!(d.related().len(), 3);
        }
    }

    #[test]
    fn test_custom_limit() {
        let mut docs: Vec<Document> = (0..4)
            .map(|i| doc(&format!("p{}", i), FrontMatter::new(), &[1.0, i as f64]))
            .collect();

        ranker().with_limit(1).execute(&mut docs).unwrap();

        assert!(docs.iter().all(|d| d.related().len() == 1));
    }

    #[test]
    fn test_limit_is_capped_at_three() {
        let mut docs: Vec<Document> = (0..6)
            .map(|i| doc(&format!("p{}", i), FrontMatter::new(), &[1.0, i as f64]))
            .collect();

        ranker().with_limit(10).execute(&mut docs).unwrap();

        assert!(docs.iter().all(|d| d.related().len() == MAX_RELATED_LIMIT));
    }

    #[test]
    fn test_fewer_candidates_than_limit() {
        let mut docs = vec![
            doc("a", FrontMatter::new(), &[1.0, 0.0]),
            doc("b", FrontMatter::new(), &[0.0, 1.0]),
        ];

        ranker().execute(&mut docs).unwrap();

        assert_eq!(docs[0].related(), &["/posts/b".to_string()]);
        assert_eq!(docs[1].related(), &["/posts/a".to_string()]);
    }

    #[test]
    fn test_single_document_gets_empty_list() {
        let mut docs = vec![doc("alone", FrontMatter::new(), &[1.0, 0.0])];

        let summary = ranker().execute(&mut docs).unwrap();

        assert!(docs[0].related().is_empty());
        assert_eq!(summary.documents_changed(), 0);
    }

    #[test]
    fn test_ties_break_on_identifier() {
        let mut docs = vec![
            doc("subject", FrontMatter::new(), &[1.0, 0.0]),
            doc("zeta", FrontMatter::new(), &[2.0, 0.0]),
            doc("alpha", FrontMatter::new(), &[3.0, 0.0]),
            doc("mid", FrontMatter::new(), &[1.0, 0.0]),
        ];

        ranker().execute(&mut docs).unwrap();

        assert_eq!(
            docs[0].related(),
            &[
                "/posts/alpha".to_string(),
                "/posts/mid".to_string(),
                "/posts/zeta".to_string()
            ]
        );
    }

    #[test]
    fn test_drafts_and_scheduled_are_not_candidates() {
        let mut docs = vec![
            doc("subject", FrontMatter::new(), &[1.0, 0.0]),
            doc("draft", FrontMatter::new().with_draft(true), &[1.0, 0.0]),
            doc(
                "scheduled",
                FrontMatter::new().with_date(PublishDate::parse("2024-07-01").unwrap()),
                &[1.0, 0.0],
            ),
            doc("other", FrontMatter::new(), &[0.0, 1.0]),
        ];

        ranker().execute(&mut docs).unwrap();

        assert_eq!(docs[0].related(), &["/posts/other".to_string()]);
        // Drafts and scheduled posts still get their own list
        assert_eq!(
            docs[1].related(),
            &["/posts/subject".to_string(), "/posts/other".to_string()]
        );
        assert_eq!(docs[2].related().len(), 2);
    }

    #[test]
    fn test_dimension_mismatch_aborts_pass() {
        let mut docs = vec![
            doc("a", FrontMatter::new(), &[1.0, 0.0]),
            doc("b", FrontMatter::new(), &[1.0, 0.0, 0.0]),
        ];

        let result = ranker().execute(&mut docs);

        assert!(matches!(
            result,
            Err(RankingError::Similarity {
                source: DomainError::DimensionMismatch { .. },
                ..
            })
        ));
        assert!(docs.iter().all(|d| d.related().is_empty()));
    }

    #[test]
    fn test_zero_magnitude_aborts_pass() {
        let mut docs = vec![
            doc("a", FrontMatter::new(), &[1.0, 0.0]),
            doc("b", FrontMatter::new(), &[0.5, 0.5]),
            doc("zero", FrontMatter::new(), &[0.0, 0.0]),
        ];

        let result = ranker().execute(&mut docs);

        assert!(matches!(
            result,
            Err(RankingError::Similarity {
                source: DomainError::ZeroMagnitude,
                ..
            })
        ));
        assert!(docs.iter().all(|d| d.related().is_empty()));
    }

    #[test]
    fn test_missing_embedding_is_an_error() {
        let mut docs = vec![
            doc("a", FrontMatter::new(), &[1.0, 0.0]),
            Document::new(
                DocumentId::new("content/posts/b/index.md").unwrap(),
                FrontMatter::new(),
                "",
            ),
        ];

        let result = ranker().execute(&mut docs);

        assert!(matches!(result, Err(RankingError::MissingEmbedding(_))));
    }

    #[test]
    fn test_second_pass_reports_no_changes() {
        let mut docs: Vec<Document> = (0..5)
            .map(|i| doc(&format!("p{}", i), FrontMatter::new(), &[1.0, i as f64, 0.5]))
            .collect();

        let first = ranker().execute(&mut docs).unwrap();
        let lists: Vec<Vec<String>> = docs.iter().map(|d| d.related().to_vec()).collect();
        let second = ranker().execute(&mut docs).unwrap();

        assert_eq!(first.documents_changed(), 5);
        assert_eq!(second.documents_changed(), 0);
        let again: Vec<Vec<String>> = docs.iter().map(|d| d.related().to_vec()).collect();
        assert_eq!(lists, again);
    }
}
