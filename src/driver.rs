//! Drive a paginated dump to completion
use std::io::Write;

use anyhow::{Context, Result, anyhow, bail};

use crate::msg::{build_dump_request, Cursor, InfoCategory, Response, TableId};
#[mockall_double::double]
use crate::transport::Connection;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DumpState {
    /// Ready to request the next page
    Idle,
    /// A request is in flight; waiting for its Completion
    AwaitingResponse,
    Done,
    Failed,
}

/// One dump of one server-side table.
///
/// The server caps the size of each reply, so a dump may take several request/response cycles.
/// Every cycle ends with a Completion message, which alone decides whether another cycle is
/// needed.  At most one request is ever in flight.
#[derive(Debug)]
pub struct Dump {
    category: InfoCategory,
    filter: Option<Vec<u8>>,
    bufsz: u32,
    marker: Cursor,
    table_id: TableId,
    state: DumpState,
    requests: usize,
}

impl Dump {
    pub fn new(category: InfoCategory, filter: Option<Vec<u8>>, bufsz: u32) -> Self {
        Dump {
            category,
            filter,
            bufsz,
            marker: Cursor::START,
            table_id: TableId::NONE,
            state: DumpState::Idle,
            requests: 0,
        }
    }

    pub fn state(&self) -> DumpState {
        self.state
    }

    pub fn marker(&self) -> Cursor {
        self.marker
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Number of requests sent so far
    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Run the dump, copying every page of text to `out`.
    ///
    /// Any send, receive, or write error is fatal: the dump moves to `Failed` and the error is
    /// returned.  Nothing is retried.
    pub fn run<W: Write>(&mut self, conn: &mut Connection, out: &mut W) -> Result<()> {
        loop {
            let r = match self.state {
                DumpState::Idle => self.request(conn),
                DumpState::AwaitingResponse => self.receive(conn, out),
                DumpState::Done => return out.flush().context("writing dump output"),
                DumpState::Failed => bail!("dump has already failed"),
            };
            if let Err(e) = r {
                self.state = DumpState::Failed;
                return Err(e);
            }
        }
    }

    fn request(&mut self, conn: &mut Connection) -> Result<()> {
        let req = build_dump_request(self.category, self.marker, self.table_id,
            self.filter.as_deref(), self.bufsz);
        log::debug!("requesting {} dump after marker {} in table {}",
            self.category, self.marker.0, self.table_id.0);
        conn.send(&req).context("sending dump request")?;
        self.requests += 1;
        self.state = DumpState::AwaitingResponse;
        Ok(())
    }

    fn receive<W: Write>(&mut self, conn: &mut Connection, out: &mut W) -> Result<()> {
        let resp = conn.recv()
            .context("receiving dump response")?
            .ok_or_else(|| anyhow!("connection closed before the dump completed"))?;
        log::trace!("received {:?}", resp);
        match resp {
            Response::Payload { text, marker, table_id } => {
                if let Some(text) = text {
                    out.write_all(&text).context("writing dump output")?;
                }
                if let Some(marker) = marker {
                    self.marker = marker;
                }
                if let Some(table_id) = table_id {
                    self.table_id = table_id;
                }
            }
            Response::Completion { more: true } => {
                self.state = DumpState::Idle;
            }
            Response::Completion { more: false } => {
                log::debug!("{} dump complete after {} requests", self.category, self.requests);
                self.state = DumpState::Done;
            }
        }
        Ok(())
    }
}

/// Dump every page of `category` from the server, printing it to `out`
pub fn run_dump<W: Write>(
    conn: &mut Connection,
    category: InfoCategory,
    filter: Option<Vec<u8>>,
    bufsz: u32,
    out: &mut W) -> Result<()>
{
    Dump::new(category, filter, bufsz).run(conn, out)
}
