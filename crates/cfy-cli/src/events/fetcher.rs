//! Incremental event retrieval.

use cfy_rest::{ClientError, Event, EventPage, ExecutionId, ManagerClient};
use tracing::{debug, trace};

/// Position of the next unread event of one execution.
///
/// Advances only by the number of events actually received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor {
    from_event: u64,
}

impl Cursor {
    /// A cursor positioned at `from_event`.
    #[must_use]
    pub const fn at(from_event: u64) -> Self {
        Self { from_event }
    }

    /// Absolute index of the next event to read.
    #[must_use]
    pub const fn from_event(self) -> u64 {
        self.from_event
    }

    #[must_use]
    const fn advance(self, received: u64) -> Self {
        Self {
            from_event: self.from_event.saturating_add(received),
        }
    }
}

/// Drains new events of an execution page by page.
#[derive(Debug)]
pub struct EventFetcher<'a, C: ?Sized> {
    client: &'a C,
    batch_size: u32,
    include_logs: bool,
}

impl<'a, C: ManagerClient + ?Sized> EventFetcher<'a, C> {
    /// A fetcher requesting `batch_size` events per page.
    #[must_use]
    pub fn new(client: &'a C, batch_size: u32, include_logs: bool) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
            include_logs,
        }
    }

    /// Events requested per page.
    #[must_use]
    pub const fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Fetch every event after `cursor` and the advanced cursor.
    ///
    /// Pages are requested until one comes back empty or the cursor
    /// reaches the manager's total. On error nothing is returned and
    /// the caller's cursor stays valid for a retry.
    ///
    /// # Errors
    ///
    /// Returns the first client error other than a missing events index.
    pub fn fetch_new(
        &self,
        execution_id: &ExecutionId,
        cursor: Cursor,
    ) -> Result<(Vec<Event>, Cursor), ClientError> {
        let mut events = Vec::new();
        let mut next = cursor;

        loop {
            let page = match self.fetch_page(execution_id, next.from_event(), self.batch_size) {
                Ok(page) => page,
                Err(err) if err.is_index_missing() => {
                    debug!(%execution_id, "events index not created yet");
                    break;
                }
                Err(err) => return Err(err),
            };

            if next.from_event() > page.total {
                debug!(
                    %execution_id,
                    from_event = next.from_event(),
                    total = page.total,
                    "cursor beyond reported total"
                );
                break;
            }

            let received = page.items.len() as u64;
            if received == 0 {
                break;
            }
            next = next.advance(received);
            events.extend(page.items);

            // Pages may come back shorter than asked when the manager caps
            // the page size, so only the total ends a non-empty drain.
            if next.from_event() >= page.total {
                break;
            }
        }

        trace!(
            %execution_id,
            received = events.len(),
            from_event = next.from_event(),
            "fetched events"
        );
        Ok((events, next))
    }

    /// Fetch a single page without any cursor bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns the client error unchanged.
    pub fn fetch_page(
        &self,
        execution_id: &ExecutionId,
        offset: u64,
        size: u32,
    ) -> Result<EventPage, ClientError> {
        self.client
            .list_events(execution_id, offset, size, self.include_logs)
    }
}
