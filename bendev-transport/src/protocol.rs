//! Framing of SCPI text over fixed-size HID reports
//!
//! Outgoing commands are the command text followed by the terminator, split
//! into report-sized chunks and zero-padded. Replies are reassembled from
//! incoming report payloads in arrival order. A reply ends at the first
//! terminator sequence, or at the NUL padding of a short report, which is
//! how instruments that never send the terminator mark the end of a reply.

/// Payload size of one HID report (excluding the report ID byte)
pub const REPORT_SIZE: usize = 64;

/// Report ID prefixed to every output report (devices use unnumbered reports)
pub const REPORT_ID: u8 = 0x00;

/// Default terminator appended to commands and expected on replies
pub const DEFAULT_TERMINATOR: &[u8] = b"\n";

/// Padding byte filling the unused tail of a report
pub const PAD: u8 = 0x00;

/// Split a command into zero-padded report payloads
///
/// The terminator is appended before splitting, so a command whose length
/// is an exact multiple of `report_size` spills the terminator into an
/// extra report. An empty command with an empty terminator still yields
/// one (all-padding) report.
pub fn frame_command(command: &[u8], terminator: &[u8], report_size: usize) -> Vec<Vec<u8>> {
    let report_size = report_size.max(1);
    let mut message = Vec::with_capacity(command.len() + terminator.len());
    message.extend_from_slice(command);
    message.extend_from_slice(terminator);

    if message.is_empty() {
        return vec![vec![PAD; report_size]];
    }

    message
        .chunks(report_size)
        .map(|chunk| {
            let mut report = vec![PAD; report_size];
            report[..chunk.len()].copy_from_slice(chunk);
            report
        })
        .collect()
}

/// Accumulates report payloads until a complete reply has arrived
#[derive(Debug, Clone)]
pub struct ReplyAccumulator {
    terminator: Vec<u8>,
    buf: Vec<u8>,
    reports: usize,
    complete: bool,
}

impl ReplyAccumulator {
    /// Create an accumulator waiting for `terminator`
    pub fn new(terminator: &[u8]) -> Self {
        Self {
            terminator: terminator.to_vec(),
            buf: Vec::with_capacity(REPORT_SIZE),
            reports: 0,
            complete: false,
        }
    }

    /// Append one report payload; returns `true` once the reply is complete
    ///
    /// Payloads pushed after completion are ignored.
    pub fn push(&mut self, payload: &[u8]) -> bool {
        if self.complete {
            return true;
        }
        self.reports += 1;

        let (data, padded) = match payload.iter().position(|&b| b == PAD) {
            Some(end) => (&payload[..end], true),
            None => (payload, false),
        };

        // A terminator may straddle two reports
        let search_from = self
            .buf
            .len()
            .saturating_sub(self.terminator.len().saturating_sub(1));
        self.buf.extend_from_slice(data);

        if let Some(pos) = find(&self.buf[search_from..], &self.terminator) {
            self.buf.truncate(search_from + pos);
            self.complete = true;
        } else if padded {
            self.complete = true;
        }
        self.complete
    }

    /// Whether the end of the reply has been seen
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of reports consumed so far
    pub fn reports(&self) -> usize {
        self.reports
    }

    /// Bytes accumulated so far (terminator excluded once complete)
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the accumulator, returning the reply without trailing CR/LF
    pub fn into_bytes(mut self) -> Vec<u8> {
        while matches!(self.buf.last(), Some(b'\r' | b'\n')) {
            self.buf.pop();
        }
        self.buf
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_report(text: &[u8]) -> Vec<u8> {
        assert_eq!(text.len(), REPORT_SIZE);
        text.to_vec()
    }

    #[test]
    fn test_frame_short_command() {
        let reports = frame_command(b"*IDN?", DEFAULT_TERMINATOR, REPORT_SIZE);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].len(), REPORT_SIZE);
        assert_eq!(&reports[0][..6], b"*IDN?\n");
        assert!(reports[0][6..].iter().all(|&b| b == PAD));
    }

    #[test]
    fn test_frame_spills_terminator_into_next_report() {
        let cmd = vec![b'A'; REPORT_SIZE];
        let reports = frame_command(&cmd, DEFAULT_TERMINATOR, REPORT_SIZE);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0], cmd);
        assert_eq!(reports[1][0], b'\n');
        assert_eq!(reports[1][1], PAD);
    }

    #[test]
    fn test_frame_long_command_keeps_order() {
        let cmd: Vec<u8> = (0..150).map(|i| b'a' + (i % 26) as u8).collect();
        let reports = frame_command(&cmd, b"\r\n", REPORT_SIZE);
        assert_eq!(reports.len(), 3);
        let joined: Vec<u8> = reports.concat();
        assert_eq!(&joined[..150], &cmd[..]);
        assert_eq!(&joined[150..152], b"\r\n");
    }

    #[test]
    fn test_frame_empty_message() {
        let reports = frame_command(b"", b"", 8);
        assert_eq!(reports, vec![vec![PAD; 8]]);
    }

    #[test]
    fn test_accumulate_single_report_with_terminator() {
        let mut acc = ReplyAccumulator::new(DEFAULT_TERMINATOR);
        let mut report = b"5.402\n".to_vec();
        report.resize(REPORT_SIZE, PAD);
        assert!(acc.push(&report));
        assert_eq!(acc.into_bytes(), b"5.402");
    }

    #[test]
    fn test_accumulate_across_reports() {
        let reply = b"\"Bentham Instruments Ltd.\",\"MSH150_RD_Direct\",\"99999/9\",\"1.2.53\"\n";
        let mut acc = ReplyAccumulator::new(DEFAULT_TERMINATOR);
        let mut done = false;
        for chunk in reply.chunks(16) {
            done = acc.push(chunk);
        }
        assert!(done);
        assert_eq!(acc.reports(), reply.chunks(16).count());
        assert_eq!(
            acc.into_bytes(),
            b"\"Bentham Instruments Ltd.\",\"MSH150_RD_Direct\",\"99999/9\",\"1.2.53\""
        );
    }

    #[test]
    fn test_terminator_straddles_reports() {
        let mut acc = ReplyAccumulator::new(b"\r\n");
        assert!(!acc.push(b"OK\r"));
        assert!(acc.push(b"\nignored"));
        assert_eq!(acc.into_bytes(), b"OK");
    }

    #[test]
    fn test_full_report_without_terminator_is_incomplete() {
        let mut acc = ReplyAccumulator::new(DEFAULT_TERMINATOR);
        assert!(!acc.push(&full_report(&[b'x'; REPORT_SIZE])));
        assert!(!acc.is_complete());
        assert_eq!(acc.pending().len(), REPORT_SIZE);
    }

    #[test]
    fn test_padding_ends_reply_without_terminator() {
        let mut acc = ReplyAccumulator::new(DEFAULT_TERMINATOR);
        let mut report = b"0\r\n".to_vec();
        report.truncate(1);
        report.resize(REPORT_SIZE, PAD);
        assert!(acc.push(&report));
        assert_eq!(acc.into_bytes(), b"0");
    }

    #[test]
    fn test_trailing_cr_is_stripped() {
        let mut acc = ReplyAccumulator::new(b"");
        let mut report = b"1.0\r\n".to_vec();
        report.resize(REPORT_SIZE, PAD);
        assert!(acc.push(&report));
        assert_eq!(acc.into_bytes(), b"1.0");
    }

    #[test]
    fn test_push_after_complete_is_ignored() {
        let mut acc = ReplyAccumulator::new(DEFAULT_TERMINATOR);
        assert!(acc.push(b"A\n"));
        assert!(acc.push(b"B\n"));
        assert_eq!(acc.reports(), 1);
        assert_eq!(acc.into_bytes(), b"A");
    }
}
