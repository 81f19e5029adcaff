//! Lazy iteration over the records of a multi-page search.

use std::collections::VecDeque;
use std::iter::FusedIterator;

use roxmltree::Node;
use tracing::debug;

use crate::config::DEFAULT_START_RECORD;
use crate::error::{Result, SruError};
use crate::harvester::Harvester;
use crate::models::{EchoedRequest, Record};
use crate::types::RequestParameters;
use crate::xml::{
    find_descendant, find_descendants, get_text, has_qualified_tag, Element, Fragment,
    NamespacePolicy,
};

/// Outcome of [`RecordIterator::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Record(Box<Record>),
    EndOfSequence,
}

/// Where a [`RecordIterator`] is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorState {
    /// Not fetched yet.
    Fresh,
    /// A page request is in flight.
    Fetching,
    /// Records of the current page remain, or another page may follow.
    HasRecord,
    /// All wanted records were produced.
    Exhausted,
    /// A fetch failed; the iterator produces nothing more.
    Failed,
}

/// Forward-only sequence of the records matching a search.
///
/// Pages are requested as the records of the previous page run out. The
/// first page is fetched when the iterator is created; its
/// `numberOfRecords` caps the number of records wanted for the whole
/// iteration, even if later pages report a different total.
pub struct RecordIterator<'a> {
    harvester: &'a Harvester,
    params: RequestParameters,
    policy: NamespacePolicy,
    start_record: u32,
    page_size: u32,
    records_wanted: u64,
    number_of_records: u64,
    echo: Option<EchoedRequest>,
    pending: VecDeque<Fragment>,
    pages_fetched: usize,
    state: IteratorState,
}

impl<'a> RecordIterator<'a> {
    /// Start iterating and fetch the first page.
    ///
    /// A positive `maximumRecords` in `params` caps the number of records
    /// produced; otherwise every available record is produced. No request
    /// asks for more than `threshold` records.
    pub fn new(
        harvester: &'a Harvester,
        mut params: RequestParameters,
        threshold: u32,
        policy: NamespacePolicy,
    ) -> Result<Self> {
        let records_wanted = params
            .get_u32("maximumRecords")
            .filter(|max| *max > 0)
            .map_or(u64::MAX, u64::from);
        let threshold = threshold.max(1);
        let page_size =
            u32::try_from(records_wanted.min(u64::from(threshold))).unwrap_or(threshold);
        let start_record = params
            .get_u32("startRecord")
            .filter(|start| *start > 0)
            .unwrap_or(DEFAULT_START_RECORD);

        params.set("startRecord", start_record);
        params.set("maximumRecords", page_size);

        let mut iterator = Self {
            harvester,
            params,
            policy,
            start_record,
            page_size,
            records_wanted,
            number_of_records: 0,
            echo: None,
            pending: VecDeque::new(),
            pages_fetched: 0,
            state: IteratorState::Fresh,
        };

        let (number_of_records, echo) = iterator.fetch_page()?;
        iterator.number_of_records = number_of_records;
        iterator.records_wanted = iterator.records_wanted.min(number_of_records);
        iterator.echo = echo;
        if number_of_records == 0 {
            iterator.pending.clear();
            iterator.state = IteratorState::Exhausted;
        }

        Ok(iterator)
    }

    /// Produce the next record, fetching the next page when needed.
    ///
    /// A failed fetch ends the sequence; every later call returns
    /// [`SruError::IteratorTerminated`].
    pub fn advance(&mut self) -> Result<Advance> {
        loop {
            match self.state {
                IteratorState::Failed => return Err(SruError::IteratorTerminated),
                IteratorState::Exhausted => return Ok(Advance::EndOfSequence),
                _ => {}
            }

            if let Some(fragment) = self.pending.pop_front() {
                return match Record::from_fragment(&fragment, self.policy) {
                    Ok(record) => Ok(Advance::Record(Box::new(record))),
                    Err(e) => {
                        self.state = IteratorState::Failed;
                        Err(e)
                    }
                };
            }

            if !self.has_next_page() {
                self.state = IteratorState::Exhausted;
                return Ok(Advance::EndOfSequence);
            }

            self.start_record = self.start_record.saturating_add(self.page_size);
            self.params.set("startRecord", self.start_record);
            debug!(start_record = self.start_record, "Fetching next page");
            self.fetch_page()?;
        }
    }

    fn has_next_page(&self) -> bool {
        u64::from(self.start_record) + u64::from(self.page_size) < self.records_wanted
    }

    /// Fetch the page at the current `startRecord` and queue its records.
    ///
    /// Returns the page's `numberOfRecords` and echoed request.
    fn fetch_page(&mut self) -> Result<(u64, Option<EchoedRequest>)> {
        self.state = IteratorState::Fetching;
        let result = self.load_page();
        self.state = match &result {
            Ok(_) => IteratorState::HasRecord,
            Err(_) => IteratorState::Failed,
        };
        result
    }

    fn load_page(&mut self) -> Result<(u64, Option<EchoedRequest>)> {
        let envelope = self.harvester.fetch(&self.params)?;
        self.pages_fetched += 1;

        let doc = envelope.xml()?;
        let root = doc.root_element();
        let namespace = self.harvester.version().namespace();

        let number_of_records = find_descendant(root, namespace, "numberOfRecords")
            .and_then(|node| get_text(node).parse::<u64>().ok())
            .unwrap_or(0);
        let echo = find_descendant(root, namespace, "echoedSearchRetrieveRequest")
            .map(|node| EchoedRequest::from_element(&Element::from_node(node)));

        self.pending = find_descendants(root, namespace, "record")
            .filter(|node| !is_nested_record(*node, namespace))
            .map(Fragment::from_node)
            .collect();

        debug!(
            start_record = self.start_record,
            records = self.pending.len(),
            number_of_records,
            "Fetched page"
        );
        Ok((number_of_records, echo))
    }

    /// Total reported by the first page.
    pub fn number_of_records(&self) -> u64 {
        self.number_of_records
    }

    /// Echoed request of the first page.
    pub fn echo(&self) -> Option<&EchoedRequest> {
        self.echo.as_ref()
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// `startRecord` of the most recent request.
    pub fn start_record(&self) -> u32 {
        self.start_record
    }

    /// `maximumRecords` sent with every request.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn state(&self) -> IteratorState {
        self.state
    }
}

/// Whether a record element sits inside another SRU record, as in explain
/// payloads or records that embed SRU markup.
fn is_nested_record(node: Node<'_, '_>, namespace: &str) -> bool {
    node.ancestors()
        .skip(1)
        .any(|ancestor| has_qualified_tag(ancestor, namespace, "record"))
}

impl Iterator for RecordIterator<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, IteratorState::Failed | IteratorState::Exhausted) {
            return None;
        }
        match self.advance() {
            Ok(Advance::Record(record)) => Some(Ok(*record)),
            Ok(Advance::EndOfSequence) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl FusedIterator for RecordIterator<'_> {}
