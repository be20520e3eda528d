//! Messages exchanged with the worker process: one JSON request on its
//! stdin, newline-delimited JSON messages on its stdout.

use crate::config::Config;
use crate::engine::Termination;
use crate::model::{Instance, Solution};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct WorkerRequest {
    pub instance: Instance,
    #[serde(default)]
    pub config: Config,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    Log { line: String },
    Bound { value: f64 },
    Objective { value: f64 },
    Tier { index: usize, priority: u32 },
    Solution { solution: Option<Solution> },
    /// Sent last, after the solution, when the search concluded.
    Completed { termination: Termination },
}

impl WorkerMessage {
    pub fn write_to(&self, mut out: impl Write) -> io::Result<()> {
        serde_json::to_writer(&mut out, self)?;
        out.write_all(b"\n")?;
        out.flush()
    }

    /// Next message, `None` at end of stream. Malformed lines are reported as
    /// `InvalidData` errors.
    pub fn read_from(input: &mut impl BufRead) -> io::Result<Option<WorkerMessage>> {
        let mut line = String::new();
        loop {
            line.clear();
            if input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if !line.trim().is_empty() {
                break;
            }
        }
        serde_json::from_str(&line)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProjectId, StudentId};

    #[test]
    fn messages_are_tagged_json_lines() {
        let mut buffer = Vec::new();
        WorkerMessage::Tier {
            index: 1,
            priority: 5,
        }
        .write_to(&mut buffer)
        .unwrap();
        WorkerMessage::Completed {
            termination: Termination::Infeasible,
        }
        .write_to(&mut buffer)
        .unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert_eq!(
            text,
            "{\"type\":\"tier\",\"index\":1,\"priority\":5}\n\
             {\"type\":\"completed\",\"termination\":\"infeasible\"}\n"
        );
        let mut input = &buffer[..];
        assert!(matches!(
            WorkerMessage::read_from(&mut input).unwrap(),
            Some(WorkerMessage::Tier { index: 1, .. })
        ));
        assert!(WorkerMessage::read_from(&mut input).unwrap().is_some());
        assert!(WorkerMessage::read_from(&mut input).unwrap().is_none());
    }

    #[test]
    fn missing_solution_is_null() {
        let message: WorkerMessage =
            serde_json::from_str(r#"{"type":"solution","solution":null}"#).unwrap();
        assert_eq!(message, WorkerMessage::Solution { solution: None });
        let message: WorkerMessage = serde_json::from_str(
            r#"{"type":"solution","solution":{"assignments":[[1,2]]}}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            WorkerMessage::Solution {
                solution: Some(Solution::new(vec![(StudentId(1), ProjectId(2))]))
            }
        );
    }

    #[test]
    fn garbage_is_invalid_data() {
        let mut input = &b"not json\n"[..];
        let err = WorkerMessage::read_from(&mut input).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn request_config_defaults() {
        let request: WorkerRequest =
            serde_json::from_str(r#"{"instance":{"students":[],"projects":[],"languages":[]}}"#)
                .unwrap();
        assert_eq!(request.config, Config::default());
    }
}
