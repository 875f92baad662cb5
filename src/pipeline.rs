use std::path::PathBuf;

use tracing::{info, warn};

use crate::embed::{EmbedError, Embedder};
use crate::graph::{build_graph, write_html};
use crate::scholar::types::Paper;
use crate::scholar::{ScholarClient, ScholarError, clean_references};
use crate::score::{ScoredReference, score_references, sort_by_score};
use crate::store::{self, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Paper not found. ({0})")]
    PaperNotFound(ScholarError),

    #[error("References not found. ({0})")]
    ReferencesNotFound(ScholarError),

    #[error("paper '{0}' has no Semantic Scholar id")]
    MissingPaperId(String),

    #[error("{0}")]
    Scholar(#[from] ScholarError),

    #[error("{0}")]
    Embed(#[from] EmbedError),

    #[error("{0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub title: String,
    /// Previously saved scores; skips fetching and scoring when set.
    pub data: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub max_references: usize,
    /// Draw only the N best references.
    pub top: Option<usize>,
}

#[derive(Debug)]
pub struct RunOutput {
    pub paper: Paper,
    pub scored: Vec<ScoredReference>,
    pub saved_to: Option<PathBuf>,
    pub graph_path: PathBuf,
}

/// search → references → clean → score → save → graph.
pub struct Refscope<E> {
    scholar: ScholarClient,
    embedder: Option<E>,
}

impl<E: Embedder> Refscope<E> {
    pub fn new(scholar: ScholarClient, embedder: Option<E>) -> Self {
        Self { scholar, embedder }
    }

    fn embedder(&self) -> Result<&E, EmbedError> {
        self.embedder.as_ref().ok_or(EmbedError::ApiKeyNotSet)
    }

    pub async fn run(&self, opts: &RunOptions) -> Result<RunOutput, PipelineError> {
        info!(title = %opts.title, "searching paper");
        let paper = self
            .scholar
            .search_paper(&opts.title)
            .await
            .map_err(|e| match e {
                ScholarError::NotFound(_) => PipelineError::PaperNotFound(e),
                e => e.into(),
            })?;
        let year = paper.year.map(|y| y.to_string()).unwrap_or_default();
        println!("Paper found: {} {year}", paper.title);

        let paper_id = paper
            .paper_id
            .clone()
            .ok_or_else(|| PipelineError::MissingPaperId(paper.title.clone()))?;

        let (mut scored, saved_to) = match &opts.data {
            Some(path) => {
                println!("Attempting to load data...");
                let scored = store::load(path)?;
                println!("Data loaded");
                (scored, None)
            }
            None => {
                let scored = self.fetch_and_score(&paper, &paper_id, opts).await?;
                println!("Attempting to save results...");
                let path = store::save(&opts.out_dir, &paper_id, &scored)?;
                println!("Saved! {}", path.display());
                (scored, Some(path))
            }
        };

        sort_by_score(&mut scored);
        let drawn = match opts.top {
            Some(n) => &scored[..n.min(scored.len())],
            None => &scored[..],
        };

        let graph = build_graph(&paper, drawn);
        let graph_path = write_html(&opts.out_dir, &paper_id, &graph)?;
        info!(
            nodes = graph.nodes.len(),
            path = %graph_path.display(),
            "graph written"
        );
        println!("Graph written to {}", graph_path.display());

        Ok(RunOutput {
            paper,
            scored,
            saved_to,
            graph_path,
        })
    }

    async fn fetch_and_score(
        &self,
        paper: &Paper,
        paper_id: &str,
        opts: &RunOptions,
    ) -> Result<Vec<ScoredReference>, PipelineError> {
        let embedder = self.embedder()?;

        let references = self
            .scholar
            .get_references(paper_id, opts.max_references)
            .await
            .map_err(|e| match e {
                ScholarError::NotFound(_) => PipelineError::ReferencesNotFound(e),
                e => e.into(),
            })?;
        println!("References found");
        info!(count = references.len(), "references fetched");

        let references = clean_references(references);
        println!("References cleaned");
        if references.is_empty() {
            warn!("no resolvable references left after cleaning");
        }

        if paper.abstract_.is_none() {
            warn!("root paper has no abstract, comparing against its title");
        }
        let scored = score_references(embedder, paper, references).await?;
        println!("References scored");
        info!(count = scored.len(), "references scored");
        Ok(scored)
    }
}
