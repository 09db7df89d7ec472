use serde::{Deserialize, Serialize};

/// Execute request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExecuteRequest {
    /// Toolchain name (will be passed to toolchain loader)
    pub language: String,
    /// Submitted source text
    pub source: String,
    /// Ordered test inputs; the program is run once per entry
    #[serde(default)]
    pub inputs: Vec<String>,
}

/// Verdict for one submission
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ExecuteResponse {
    /// One of the `status_codes` constants
    pub status: i32,
    /// Captured stdout per completed run, in input order. May be shorter than
    /// `inputs` when a run failed.
    pub outputs: Vec<String>,
    /// Diagnostics for non-successful verdicts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Timing of the judged runs
    #[serde(rename = "judgeInfo")]
    pub judge_info: JudgeInfo,
}

/// Resource usage as observed by the sandbox
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct JudgeInfo {
    /// Maximum wall time across executed runs, in milliseconds
    pub time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_parses_wire_shape() {
        let raw = r#"{"language":"java","source":"class Main {}","inputs":["1 2","3 4"]}"#;
        let req: ExecuteRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.language, "java");
        assert_eq!(req.source, "class Main {}");
        assert_eq!(req.inputs, vec!["1 2".to_string(), "3 4".to_string()]);
    }

    #[test]
    fn request_inputs_default_to_empty() {
        let raw = r#"{"language":"cpp","source":"int main() {}"}"#;
        let req: ExecuteRequest = serde_json::from_str(raw).unwrap();
        assert!(req.inputs.is_empty());
    }

    #[test]
    fn response_omits_absent_message() {
        let resp = ExecuteResponse {
            status: crate::status_codes::SUCCESS,
            outputs: vec!["ok".to_string()],
            message: None,
            judge_info: JudgeInfo { time: 500 },
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["status"], 1);
        assert_eq!(value["outputs"][0], "ok");
        assert_eq!(value["judgeInfo"]["time"], 500);
        assert!(value.get("message").is_none());
    }

    #[test]
    fn response_round_trips_with_message() {
        let resp = ExecuteResponse {
            status: crate::status_codes::RUNTIME_ERROR,
            outputs: vec![],
            message: Some("process exited with code 1".to_string()),
            judge_info: JudgeInfo { time: 42 },
        };
        let raw = serde_json::to_string(&resp).unwrap();
        let back: ExecuteResponse = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.status, 3);
        assert_eq!(back.message.as_deref(), Some("process exited with code 1"));
        assert_eq!(back.judge_info.time, 42);
    }
}
