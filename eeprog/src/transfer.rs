//! Bulk transfers: page-chunked writes and streamed reads.
//!
//! ## Write sequence
//!
//! ```text
//! host                         programmer
//!  |  0x%04X\r  (page count)  ->  |
//!  |  <-  ...OK\r                 |
//!  |  64 raw bytes (page 0)   ->  |
//!  |  <-  short ack (drained)     |
//!  |  ...                         |
//! ```
//!
//! ## Read sequence
//!
//! After the `read` command is acknowledged, a lone carriage return asks the
//! programmer to start streaming. The stream ends when a chunk ends with a
//! carriage return (which is dropped) or the link goes quiet.

use std::io;

use log::{debug, info, trace};

use crate::error::{Error, Result};
use crate::link::{Link, read_chunk};
use crate::port::Port;
use crate::protocol::{Command, FRAME_TERMINATOR, is_terminated};

/// Bytes per write page.
pub const PAGE_SIZE: usize = 64;

/// Read size used while draining a page acknowledgement.
pub const PAGE_ACK_CHUNK: usize = 10;

/// Read size used while streaming memory contents.
pub const DATA_READ_CHUNK: usize = 128;

/// Number of whole pages in `len` bytes. A trailing partial page is not sent.
pub const fn page_count(len: usize) -> usize {
    len / PAGE_SIZE
}

fn write_zero() -> io::Error {
    io::Error::new(
        io::ErrorKind::WriteZero,
        "programmer didn't respond or serial port error",
    )
}

impl<P: Port> Link<P> {
    /// Announce the page count and stream every whole page of `data`.
    ///
    /// `progress` is called after each page with `(page_index, pages - 1)`.
    /// Returns the number of bytes sent. A transport failure mid-way is
    /// reported as [`Error::Transfer`] carrying the bytes already sent.
    pub fn send_data<F>(&mut self, data: &[u8], mut progress: F) -> Result<usize>
    where
        F: FnMut(usize, usize),
    {
        let pages = page_count(data.len());
        let total = pages * PAGE_SIZE;
        info!("Write {pages} pages by {PAGE_SIZE}b");

        self.send_command(&Command::PageCount(pages))?;

        debug!("Send data");
        for (index, page) in data
            .chunks_exact(PAGE_SIZE)
            .enumerate()
        {
            self.send_page(page)
                .map_err(|source| Error::Transfer {
                    transferred: index * PAGE_SIZE,
                    total,
                    source,
                })?;
            progress(index, pages - 1);
        }

        Ok(total)
    }

    /// Write one page and drain its acknowledgement without validating it.
    fn send_page(&mut self, page: &[u8]) -> io::Result<()> {
        if self.write_frame(page)? == 0 {
            return Err(write_zero());
        }
        let ack = self.read_reply(PAGE_ACK_CHUNK)?;
        trace!("Page ack: {:02X?}", ack);
        Ok(())
    }

    /// Prompt the programmer to stream and collect the data.
    ///
    /// `size` is only used for progress reporting; the returned buffer is not
    /// checked against it. `progress` receives `(bytes_so_far, size)` with
    /// `bytes_so_far` capped at `size`.
    pub fn receive_data<F>(&mut self, size: usize, mut progress: F) -> Result<Vec<u8>>
    where
        F: FnMut(usize, usize),
    {
        let transfer_err = |transferred: usize, source: io::Error| Error::Transfer {
            transferred,
            total: size,
            source,
        };

        match self.write_frame(&[FRAME_TERMINATOR]) {
            Ok(0) => return Err(transfer_err(0, write_zero())),
            Ok(_) => {},
            Err(e) => return Err(transfer_err(0, e)),
        }

        debug!("Receive data");
        let mut data = Vec::with_capacity(size);
        let mut buf = [0u8; DATA_READ_CHUNK];
        let mut received = 0usize;

        loop {
            let n = read_chunk(self.port_mut(), &mut buf)
                .map_err(|e| transfer_err(data.len(), e))?;
            if n == 0 {
                break;
            }
            received += n;
            progress(received.min(size), size);

            let chunk = &buf[..n];
            if is_terminated(chunk) {
                data.extend_from_slice(&chunk[..n - 1]);
                break;
            }
            data.extend_from_slice(chunk);
        }

        debug!("Received {} bytes", data.len());
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::mock::{MockPort, ReadEvent, WriteEvent};

    fn image(len: usize) -> Vec<u8> {
        // Never produces a carriage return.
        (0..len)
            .map(|i| 0x40 + (i % 7) as u8)
            .collect()
    }

    #[test]
    fn test_page_count_truncates() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(63), 0);
        assert_eq!(page_count(64), 1);
        assert_eq!(page_count(130), 2);
        assert_eq!(page_count(32768), 512);
    }

    #[test]
    fn test_send_data_two_pages() {
        let data = image(128);
        let mut port = MockPort::new();
        port.reply(b"OK\r")
            .reply(b"ok\r")
            .reply(b"ok\r");
        let mut link = Link::new(port);
        let mut updates = Vec::new();

        let sent = link
            .send_data(&data, |current, total| updates.push((current, total)))
            .unwrap();

        assert_eq!(sent, 128);
        let writes = link
            .port()
            .writes();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[0], b"0x0002\r");
        assert_eq!(writes[1], &data[..64]);
        assert_eq!(writes[2], &data[64..]);
        assert_eq!(updates, vec![(0, 1), (1, 1)]);
    }

    #[test]
    fn test_send_data_pages_in_ascending_order() {
        let data = image(64 * 5);
        let mut port = MockPort::new();
        port.reply(b"OK\r");
        for _ in 0..5 {
            port.reply(b"\r");
        }
        let mut link = Link::new(port);

        link.send_data(&data, |_, _| {})
            .unwrap();

        let writes = link
            .port()
            .writes();
        assert_eq!(writes[0], b"0x0005\r");
        for (i, page) in writes[1..]
            .iter()
            .enumerate()
        {
            assert_eq!(page.as_slice(), &data[i * PAGE_SIZE..(i + 1) * PAGE_SIZE]);
        }
    }

    #[test]
    fn test_send_data_drops_partial_page() {
        let data = image(100);
        let mut port = MockPort::new();
        port.reply(b"OK\r")
            .reply(b"\r");
        let mut link = Link::new(port);

        let sent = link
            .send_data(&data, |_, _| {})
            .unwrap();

        assert_eq!(sent, 64);
        assert_eq!(
            link.port()
                .writes()
                .len(),
            2
        );
    }

    #[test]
    fn test_send_data_zero_pages_only_announces() {
        let mut port = MockPort::new();
        port.reply(b"OK\r");
        let mut link = Link::new(port);
        let mut calls = 0;

        let sent = link
            .send_data(&image(10), |_, _| calls += 1)
            .unwrap();

        assert_eq!(sent, 0);
        assert_eq!(calls, 0);
        assert_eq!(link.port().writes(), &[b"0x0000\r".to_vec()]);
    }

    #[test]
    fn test_page_ack_is_not_validated() {
        let data = image(64);
        let mut port = MockPort::new();
        port.reply(b"OK\r")
            .reply(b"garbage\r");
        let mut link = Link::new(port);

        assert!(
            link.send_data(&data, |_, _| {})
                .is_ok()
        );
    }

    #[test]
    fn test_page_ack_drained_in_ten_byte_chunks() {
        let data = image(64);
        let mut port = MockPort::new();
        port.reply(b"OK\r")
            .reply(b"0123456789abc\r");
        let mut link = Link::new(port);

        link.send_data(&data, |_, _| {})
            .unwrap();

        let sizes = link
            .port()
            .read_sizes();
        assert_eq!(&sizes[sizes.len() - 2..], &[PAGE_ACK_CHUNK, PAGE_ACK_CHUNK]);
    }

    #[test]
    fn test_rejected_page_count_sends_no_pages() {
        let mut port = MockPort::new();
        port.reply(b"FAIL\r");
        let mut link = Link::new(port);

        assert!(matches!(
            link.send_data(&image(128), |_, _| {}),
            Err(Error::InvalidResponse(_))
        ));
        assert_eq!(
            link.port()
                .writes()
                .len(),
            1
        );
    }

    #[test]
    fn test_page_failure_reports_partial_progress() {
        let data = image(64 * 3);
        let mut port = MockPort::new();
        port.reply(b"OK\r")
            .reply(b"\r")
            .reply(b"\r");
        // Page-count frame and pages 0 and 1 go through; page 2 fails.
        port.fail_write_after(3, WriteEvent::Fail(io::ErrorKind::BrokenPipe));
        let mut link = Link::new(port);

        let err = link
            .send_data(&data, |_, _| {})
            .unwrap_err();

        match err {
            Error::Transfer {
                transferred, total, ..
            } => {
                assert_eq!(transferred, 128);
                assert_eq!(total, 192);
            },
            other => panic!("expected Transfer, got {other:?}"),
        }
    }

    #[test]
    fn test_page_zero_write_is_transfer_error() {
        let mut port = MockPort::new();
        port.reply(b"OK\r");
        port.fail_write_after(1, WriteEvent::Zero);
        let mut link = Link::new(port);

        let err = link
            .send_data(&image(64), |_, _| {})
            .unwrap_err();
        assert_eq!(err.transferred(), Some(0));
    }

    #[test]
    fn test_receive_data_strips_terminator() {
        let mut port = MockPort::new();
        port.reply(b"\x01\x02\x03\r");
        let mut link = Link::new(port);

        let data = link
            .receive_data(3, |_, _| {})
            .unwrap();

        assert_eq!(data, vec![1, 2, 3]);
        assert_eq!(link.port().writes(), &[b"\r".to_vec()]);
    }

    #[test]
    fn test_receive_full_32k_image() {
        let expected = image(32768);
        let mut stream = expected.clone();
        stream.push(b'\r');
        let mut port = MockPort::new();
        port.reply(&stream);
        let mut link = Link::new(port);
        let mut last = (0, 0);

        let data = link
            .receive_data(32768, |current, total| last = (current, total))
            .unwrap();

        assert_eq!(data.len(), 32768);
        assert_eq!(data, expected);
        // The terminator byte does not push progress past the total.
        assert_eq!(last, (32768, 32768));
        assert!(
            link.port()
                .read_sizes()
                .iter()
                .all(|&n| n == DATA_READ_CHUNK)
        );
    }

    #[test]
    fn test_receive_stops_on_quiet_link() {
        let mut port = MockPort::new();
        port.reply(&image(200))
            .push_read(ReadEvent::Timeout)
            .reply(b"late\r");
        let mut link = Link::new(port);

        let data = link
            .receive_data(256, |_, _| {})
            .unwrap();

        assert_eq!(data, image(200));
    }

    #[test]
    fn test_receive_progress_never_exceeds_total() {
        let mut stream = image(64);
        stream.push(b'\r');
        let mut port = MockPort::new();
        port.reply(&stream);
        let mut link = Link::new(port);
        let mut updates = Vec::new();

        link.receive_data(64, |current, total| updates.push((current, total)))
            .unwrap();

        assert_eq!(updates, vec![(64, 64)]);
        assert!(updates.iter().all(|&(current, total)| current <= total));
    }

    #[test]
    fn test_receive_nothing_is_empty() {
        let mut link = Link::new(MockPort::new());
        let data = link
            .receive_data(64, |_, _| {})
            .unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_receive_progress_is_cumulative() {
        let mut port = MockPort::new();
        port.reply(&image(300));
        let mut link = Link::new(port);
        let mut updates = Vec::new();

        link.receive_data(300, |current, total| updates.push((current, total)))
            .unwrap();

        assert_eq!(updates, vec![(128, 300), (256, 300), (300, 300)]);
    }

    #[test]
    fn test_receive_read_error_keeps_partial_count() {
        let mut port = MockPort::new();
        port.reply(&image(128))
            .push_read(ReadEvent::Fail(io::ErrorKind::BrokenPipe));
        let mut link = Link::new(port);

        let err = link
            .receive_data(256, |_, _| {})
            .unwrap_err();

        assert_eq!(err.transferred(), Some(128));
    }

    #[test]
    fn test_receive_prompt_write_zero_is_transfer_error() {
        let mut port = MockPort::new();
        port.fail_write_after(0, WriteEvent::Zero);
        let mut link = Link::new(port);

        assert!(matches!(
            link.receive_data(64, |_, _| {}),
            Err(Error::Transfer { transferred: 0, .. })
        ));
    }
}
