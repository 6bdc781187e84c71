//! Message pair exchanged with a background worker.
//!
//! Both background strategies send the same two messages: a `WorkerRequest`
//! carrying the bound, and a `WorkerResponse` carrying the count. Thread
//! workers receive them through a channel; process workers receive them as
//! one JSON object per line on stdin and answer on stdout:
//!
//! ```text
//! -> {"id":7,"bound":1000}
//! <- {"id":7,"count":168}
//! ```

use crate::{count_primes, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

/// The only message sent to a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub id: u64,
    pub bound: i64,
}

/// The only message a worker sends back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub id: u64,
    pub count: u64,
}

/// Run the count for one request
pub fn handle(req: WorkerRequest) -> WorkerResponse {
    WorkerResponse {
        id: req.id,
        count: count_primes(req.bound),
    }
}

/// Encode a message as a single JSON line (no trailing newline)
pub fn encode<T: Serialize>(msg: &T) -> Result<String> {
    Ok(serde_json::to_string(msg)?)
}

/// Decode one JSON line
pub fn decode<T: for<'de> Deserialize<'de>>(line: &str) -> Result<T> {
    Ok(serde_json::from_str(line.trim())?)
}

/// Worker side of the line protocol.
///
/// Reads requests until EOF and answers each one. Blank and malformed lines
/// are skipped. Returns the number of requests answered.
pub fn serve<R: BufRead, W: Write>(reader: R, mut writer: W) -> Result<usize> {
    let mut answered = 0;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let req: WorkerRequest = match decode(&line) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("ignoring malformed worker request {:?}: {}", line, e);
                continue;
            }
        };
        let res = handle(req);
        writeln!(writer, "{}", encode(&res)?)?;
        writer.flush()?;
        answered += 1;
    }
    Ok(answered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn responses(out: Vec<u8>) -> Vec<WorkerResponse> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| decode(l).unwrap())
            .collect()
    }

    #[test]
    fn handle_counts_primes() {
        let res = handle(WorkerRequest { id: 3, bound: 1000 });
        assert_eq!(res, WorkerResponse { id: 3, count: 168 });
    }

    #[test]
    fn serve_answers_each_line_in_order() {
        let input = "{\"id\":1,\"bound\":10}\n{\"id\":2,\"bound\":100}\n";
        let mut out = Vec::new();
        let n = serve(Cursor::new(input), &mut out).unwrap();
        assert_eq!(n, 2);
        assert_eq!(
            responses(out),
            vec![
                WorkerResponse { id: 1, count: 4 },
                WorkerResponse { id: 2, count: 25 },
            ]
        );
    }

    #[test]
    fn serve_skips_blank_and_malformed_lines() {
        let input = "\n   \nnot json\n{\"id\":9}\n{\"id\":5,\"bound\":1}\n";
        let mut out = Vec::new();
        let n = serve(Cursor::new(input), &mut out).unwrap();
        assert_eq!(n, 1);
        assert_eq!(responses(out), vec![WorkerResponse { id: 5, count: 0 }]);
    }

    #[test]
    fn extreme_values_survive_encoding() {
        let req = WorkerRequest { id: u64::MAX, bound: i64::MAX };
        let line = encode(&req).unwrap();
        assert_eq!(decode::<WorkerRequest>(&line).unwrap(), req);

        let neg = WorkerRequest { id: 0, bound: i64::MIN };
        assert_eq!(decode::<WorkerRequest>(&encode(&neg).unwrap()).unwrap(), neg);

        let res = WorkerResponse { id: 1, count: u64::MAX };
        assert_eq!(decode::<WorkerResponse>(&encode(&res).unwrap()).unwrap(), res);
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        let err = decode::<WorkerResponse>("{\"id\":1}").unwrap_err();
        assert!(matches!(err, crate::Error::ProtocolError(_)));
    }
}
