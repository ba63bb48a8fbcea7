//! JSON-lines position input for `waypoint publish`.

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::warn;
use waypoint_live::Position;

#[derive(Deserialize)]
struct InputLine {
    lat: f64,
    lng: f64,
    #[serde(default)]
    timestamp: Option<i64>,
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str, now_ms: i64) -> Result<Option<Position>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let raw: InputLine = serde_json::from_str(line)?;
    Ok(Some(Position::new(
        raw.lat,
        raw.lng,
        raw.timestamp.unwrap_or(now_ms),
    )))
}

/// Feed positions from `input` (a path, or `-` for stdin) into `tx`.
/// Returns how many positions were read.
pub async fn read_positions(input: String, tx: mpsc::Sender<Position>) -> std::io::Result<usize> {
    let reader: Box<dyn AsyncRead + Unpin + Send> = if input == "-" {
        Box::new(tokio::io::stdin())
    } else {
        Box::new(tokio::fs::File::open(&input).await?)
    };

    let mut lines = BufReader::new(reader).lines();
    let mut line_no = 0usize;
    let mut count = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        match parse_line(&line, chrono::Utc::now().timestamp_millis()) {
            Ok(Some(position)) => {
                if tx.send(position).await.is_err() {
                    break;
                }
                count += 1;
            }
            Ok(None) => {}
            Err(e) => warn!(line = line_no, error = %e, "Skipping malformed input line"),
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_timestamp() {
        let p = parse_line(r#"{"lat": 25.03, "lng": 121.56, "timestamp": 42}"#, 7)
            .unwrap()
            .unwrap();
        assert_eq!(p, Position::new(25.03, 121.56, 42));

        let p = parse_line(r#"{"lat": 25.03, "lng": 121.56}"#, 7).unwrap().unwrap();
        assert_eq!(p.timestamp, 7);
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert!(parse_line("   ", 0).unwrap().is_none());
        assert!(parse_line("# morning route", 0).unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_line(r#"{"lat": 25.03}"#, 0).is_err());
        assert!(parse_line("not json", 0).is_err());
    }

    #[tokio::test]
    async fn reads_a_file_of_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("route.jsonl");
        std::fs::write(
            &path,
            "{\"lat\": 25.0, \"lng\": 121.0, \"timestamp\": 0}\n\nbad\n{\"lat\": 25.1, \"lng\": 121.0, \"timestamp\": 5000}\n",
        )
        .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let count = read_positions(path.display().to_string(), tx).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(rx.recv().await.unwrap().timestamp, 0);
        assert_eq!(rx.recv().await.unwrap().timestamp, 5000);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let (tx, _rx) = mpsc::channel(1);
        assert!(read_positions("/nonexistent/route.jsonl".into(), tx).await.is_err());
    }
}
