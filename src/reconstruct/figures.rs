//! Deferred figure substitution.
//!
//! Figure elements that carry a page number are not expanded during the
//! main traversal. Instead they are collected, and one image job runs per
//! distinct page. Jobs for every page collected in a round are awaited
//! together; a page's result is cached so later rounds never ask for the
//! same page twice.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

use super::arena::{canonical_pdf_id, ElementId};
use crate::error::{Error, Result};
use crate::structure::StructElem;

/// Produces replacement markup (usually an `<img>`) for figure elements.
#[async_trait(?Send)]
pub trait FigureProducer {
    /// Generate markup for the figures with `element_ids` on `page`.
    ///
    /// Returns a map from structure element id to markup. Ids missing from
    /// the map are treated as failed figures.
    async fn generate(&self, page: u32, element_ids: &[String]) -> Result<HashMap<String, String>>;
}

/// A figure waiting for its page job.
#[derive(Debug, Clone)]
pub(crate) struct PendingFigure<'t> {
    pub element: ElementId,
    pub pdf_id: String,
    pub page: u32,
    pub source: &'t StructElem,
}

/// Outcome of one page job.
#[derive(Debug, Clone)]
pub(crate) enum PageFigures {
    Ready(HashMap<String, String>),
    Failed,
}

impl PageFigures {
    /// Markup for one element, if the job produced it.
    pub fn markup_for(&self, pdf_id: &str) -> Option<&str> {
        match self {
            Self::Ready(map) => map.get(pdf_id).map(String::as_str),
            Self::Failed => None,
        }
    }
}

/// Run one job per page not yet in `cache`, all awaited together.
pub(crate) async fn resolve_pages(
    producer: &dyn FigureProducer,
    pending: &[PendingFigure<'_>],
    cache: &mut HashMap<u32, PageFigures>,
) {
    let mut ids_by_page: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for figure in pending.iter().filter(|f| !cache.contains_key(&f.page)) {
        let ids = ids_by_page.entry(figure.page).or_default();
        if !ids.contains(&figure.pdf_id) {
            ids.push(figure.pdf_id.clone());
        }
    }
    if ids_by_page.is_empty() {
        return;
    }

    log::debug!("Generating figures for {} page(s)", ids_by_page.len());
    let jobs = ids_by_page
        .iter()
        .map(|(page, ids)| async move { (*page, producer.generate(*page, ids).await) });
    let results = futures::future::join_all(jobs).await;

    for (page, result) in results {
        let outcome = match result {
            Ok(map) => PageFigures::Ready(
                map.into_iter()
                    .filter_map(|(id, markup)| canonical_pdf_id(&id).map(|id| (id, markup)))
                    .collect(),
            ),
            Err(e) => {
                let e = match e {
                    Error::Figure { .. } => e,
                    other => Error::Figure {
                        page,
                        reason: other.to_string(),
                    },
                };
                log::warn!("{}", e);
                PageFigures::Failed
            },
        };
        cache.insert(page, outcome);
    }
}
