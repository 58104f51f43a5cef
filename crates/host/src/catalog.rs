//! The tool catalog: one authoritative table of the eleven operations.
//!
//! Built once at startup, owned by the host for its lifetime; no dynamic
//! registration. Every handler converts telemetry faults into structured
//! error records, so callers always receive parseable JSON.

use std::collections::HashMap;

use mcp::Tool;
use serde::Serialize;
use serde_json::{Map, Value, json};
use telemetry::{SortKey, TerminateOutcome};

/// Synchronous operation handler: keyword arguments in, flat record out.
pub type HandlerFn = fn(&Map<String, Value>) -> Value;

/// A registered operation: advertised descriptor plus handler.
pub struct Operation {
    pub tool: Tool,
    pub(crate) handler: HandlerFn,
}

/// Name-keyed operation table, preserving registration order for
/// advertisement.
pub struct Catalog {
    ops: Vec<Operation>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build the standard catalog of eleven operations.
    pub fn standard() -> Self {
        let mut catalog = Self {
            ops: Vec::new(),
            index: HashMap::new(),
        };

        catalog.register(
            "get_cpu_usage",
            "Overall and per-core CPU usage percentages, core count, and current frequency.",
            object_schema(json!({}), &[]),
            get_cpu_usage,
        );
        catalog.register(
            "get_memory_usage",
            "Virtual memory and swap usage in GB and percent.",
            object_schema(json!({}), &[]),
            get_memory_usage,
        );
        catalog.register(
            "get_disk_usage",
            "Disk usage for the filesystem holding a path.",
            object_schema(
                json!({
                    "path": {
                        "type": "string",
                        "description": "Filesystem path to inspect",
                        "default": "/"
                    }
                }),
                &[],
            ),
            get_disk_usage,
        );
        catalog.register(
            "get_top_processes",
            "Processes consuming the most CPU or memory, or sorted by name.",
            object_schema(
                json!({
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of processes to return",
                        "default": 5
                    },
                    "sort_by": {
                        "type": "string",
                        "enum": ["cpu", "memory", "name"],
                        "description": "Sort key; unrecognized values fall back to cpu",
                        "default": "cpu"
                    }
                }),
                &[],
            ),
            get_top_processes,
        );
        catalog.register(
            "get_process_info",
            "Detailed information about a single process.",
            object_schema(
                json!({
                    "pid": {"type": "integer", "description": "Process ID"}
                }),
                &["pid"],
            ),
            get_process_info,
        );
        catalog.register(
            "search_process_by_name",
            "Processes whose name contains a substring, case-insensitively.",
            object_schema(
                json!({
                    "name": {"type": "string", "description": "Substring to match"}
                }),
                &["name"],
            ),
            search_process_by_name,
        );
        catalog.register(
            "get_system_summary",
            "One-line health overview: CPU, memory, disk, process count, boot time.",
            object_schema(json!({}), &[]),
            get_system_summary,
        );
        catalog.register(
            "get_network_stats",
            "Cumulative network I/O counters across all interfaces.",
            object_schema(json!({}), &[]),
            get_network_stats,
        );
        catalog.register(
            "terminate_process",
            "Terminate a process gracefully, escalating to a forced kill after 3 seconds.",
            object_schema(
                json!({
                    "pid": {"type": "integer", "description": "Process ID"}
                }),
                &["pid"],
            ),
            terminate_process,
        );
        catalog.register(
            "suspend_process",
            "Suspend (pause) a process.",
            object_schema(
                json!({
                    "pid": {"type": "integer", "description": "Process ID"}
                }),
                &["pid"],
            ),
            suspend_process,
        );
        catalog.register(
            "resume_process",
            "Resume a suspended process.",
            object_schema(
                json!({
                    "pid": {"type": "integer", "description": "Process ID"}
                }),
                &["pid"],
            ),
            resume_process,
        );

        catalog
    }

    fn register(
        &mut self,
        name: &str,
        description: &str,
        input_schema: Value,
        handler: HandlerFn,
    ) {
        self.index.insert(name.to_string(), self.ops.len());
        self.ops.push(Operation {
            tool: Tool {
                name: name.to_string(),
                description: Some(description.to_string()),
                input_schema,
            },
            handler,
        });
    }

    /// Look up an operation by name.
    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.index.get(name).map(|&i| &self.ops[i])
    }

    /// The advertised descriptors, in registration order.
    pub fn tools(&self) -> Vec<Tool> {
        self.ops.iter().map(|op| op.tool.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Execute an operation synchronously. Returns `None` for an unknown
    /// name; every known operation returns a JSON record, never a fault.
    pub fn dispatch(&self, name: &str, args: &Map<String, Value>) -> Option<Value> {
        self.get(name).map(|op| (op.handler)(args))
    }
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

// --- Handlers ---

fn get_cpu_usage(_args: &Map<String, Value>) -> Value {
    to_record(&telemetry::cpu_snapshot())
}

fn get_memory_usage(_args: &Map<String, Value>) -> Value {
    to_record(&telemetry::memory_snapshot())
}

fn get_disk_usage(args: &Map<String, Value>) -> Value {
    // Absent means the default; present-but-wrong-typed is a fault.
    let path = match args.get("path") {
        None => "/",
        Some(Value::String(path)) => path,
        Some(_) => return json!({"error": "invalid 'path': expected a string"}),
    };
    match telemetry::disk_snapshot(path) {
        Ok(snapshot) => to_record(&snapshot),
        Err(e) => error_record(&e),
    }
}

fn get_top_processes(args: &Map<String, Value>) -> Value {
    let limit = match args.get("limit") {
        None => 5,
        Some(value) => match value.as_u64() {
            Some(limit) => limit as usize,
            None => {
                return json!({"error": "invalid 'limit': expected a non-negative integer"});
            }
        },
    };
    let sort = match args.get("sort_by") {
        None => SortKey::Cpu,
        Some(Value::String(key)) => SortKey::parse(key),
        Some(_) => return json!({"error": "invalid 'sort_by': expected a string"}),
    };
    to_record(&telemetry::top_processes(limit, sort))
}

fn get_process_info(args: &Map<String, Value>) -> Value {
    let Some(pid) = arg_pid(args) else {
        return json!({"error": "missing or invalid 'pid'"});
    };
    match telemetry::process_detail(pid) {
        Ok(snapshot) => {
            let mut record = to_record(&snapshot);
            if let Some(object) = record.as_object_mut() {
                object.insert("timestamp".to_string(), json!(timestamp()));
            }
            record
        }
        Err(e) => error_record(&e),
    }
}

fn search_process_by_name(args: &Map<String, Value>) -> Value {
    let Some(name) = args.get("name").and_then(Value::as_str) else {
        return json!({"error": "missing or invalid 'name'"});
    };
    to_record(&telemetry::search_processes(name))
}

fn get_system_summary(_args: &Map<String, Value>) -> Value {
    to_record(&telemetry::system_summary())
}

fn get_network_stats(_args: &Map<String, Value>) -> Value {
    to_record(&telemetry::network_snapshot())
}

fn terminate_process(args: &Map<String, Value>) -> Value {
    let Some(pid) = arg_pid(args) else {
        return json!({"success": false, "error": "missing or invalid 'pid'"});
    };
    match telemetry::terminate_process(pid) {
        Ok(TerminateOutcome::Graceful { name }) => json!({
            "success": true,
            "message": format!("Process {name} (PID: {pid}) successfully terminated"),
            "timestamp": timestamp(),
        }),
        Ok(TerminateOutcome::Forced { .. }) => json!({
            "success": true,
            "message": format!("Process {pid} forcefully killed"),
            "timestamp": timestamp(),
        }),
        Err(e) => control_error(&e),
    }
}

fn suspend_process(args: &Map<String, Value>) -> Value {
    let Some(pid) = arg_pid(args) else {
        return json!({"success": false, "error": "missing or invalid 'pid'"});
    };
    match telemetry::suspend_process(pid) {
        Ok(name) => json!({
            "success": true,
            "message": format!("Process {name} (PID: {pid}) suspended"),
            "timestamp": timestamp(),
        }),
        Err(e) => control_error(&e),
    }
}

fn resume_process(args: &Map<String, Value>) -> Value {
    let Some(pid) = arg_pid(args) else {
        return json!({"success": false, "error": "missing or invalid 'pid'"});
    };
    match telemetry::resume_process(pid) {
        Ok(name) => json!({
            "success": true,
            "message": format!("Process {name} (PID: {pid}) resumed"),
            "timestamp": timestamp(),
        }),
        Err(e) => control_error(&e),
    }
}

// --- Helpers ---

fn arg_pid(args: &Map<String, Value>) -> Option<u32> {
    args.get("pid")
        .and_then(Value::as_u64)
        .and_then(|pid| u32::try_from(pid).ok())
}

fn to_record<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| json!({"error": format!("serialization failed: {e}")}))
}

fn error_record(e: &telemetry::Error) -> Value {
    json!({"error": e.to_string()})
}

fn control_error(e: &telemetry::Error) -> Value {
    json!({"success": false, "error": e.to_string()})
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn standard_catalog_has_eleven_operations() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.len(), 11);
        for name in [
            "get_cpu_usage",
            "get_memory_usage",
            "get_disk_usage",
            "get_top_processes",
            "get_process_info",
            "search_process_by_name",
            "get_system_summary",
            "get_network_stats",
            "terminate_process",
            "suspend_process",
            "resume_process",
        ] {
            assert!(catalog.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn descriptors_are_object_schemas() {
        let catalog = Catalog::standard();
        for tool in catalog.tools() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            assert!(tool.input_schema["properties"].is_object());
            assert!(tool.description.is_some());
        }
    }

    #[test]
    fn unknown_operation_is_none() {
        let catalog = Catalog::standard();
        assert!(catalog.dispatch("get_gpu_usage", &Map::new()).is_none());
    }

    #[test]
    fn disk_usage_invalid_path_is_error_record() {
        let catalog = Catalog::standard();
        let record = catalog
            .dispatch("get_disk_usage", &args(json!({"path": "/no/such/mount"})))
            .unwrap();
        assert!(record["error"].is_string());
    }

    #[test]
    fn top_processes_applies_limit_and_default() {
        let catalog = Catalog::standard();
        let record = catalog
            .dispatch("get_top_processes", &args(json!({"limit": 2})))
            .unwrap();
        assert!(record.as_array().unwrap().len() <= 2);

        let record = catalog.dispatch("get_top_processes", &Map::new()).unwrap();
        assert!(record.as_array().unwrap().len() <= 5);
    }

    #[test]
    fn wrong_typed_optional_arguments_are_error_records() {
        let catalog = Catalog::standard();

        let record = catalog
            .dispatch("get_disk_usage", &args(json!({"path": 123})))
            .unwrap();
        assert!(record["error"].is_string());
        assert!(record.get("total_gb").is_none());

        let record = catalog
            .dispatch("get_top_processes", &args(json!({"limit": "five"})))
            .unwrap();
        assert!(record["error"].is_string());

        let record = catalog
            .dispatch("get_top_processes", &args(json!({"sort_by": 3})))
            .unwrap();
        assert!(record["error"].is_string());
    }

    #[test]
    fn process_info_requires_pid() {
        let catalog = Catalog::standard();
        let record = catalog.dispatch("get_process_info", &Map::new()).unwrap();
        assert!(record["error"].is_string());
        assert!(record.get("pid").is_none());
    }

    #[test]
    fn process_info_for_current_process() {
        let catalog = Catalog::standard();
        let record = catalog
            .dispatch(
                "get_process_info",
                &args(json!({"pid": std::process::id()})),
            )
            .unwrap();
        assert_eq!(record["pid"], std::process::id());
        assert!(record["timestamp"].is_string());
    }

    #[test]
    fn control_without_pid_reports_failure() {
        let catalog = Catalog::standard();
        for name in ["terminate_process", "suspend_process", "resume_process"] {
            let record = catalog.dispatch(name, &Map::new()).unwrap();
            assert_eq!(record["success"], false, "{name}");
            assert!(record["error"].is_string(), "{name}");
        }
    }

    #[test]
    fn control_of_missing_process_reports_failure() {
        let catalog = Catalog::standard();
        let record = catalog
            .dispatch("suspend_process", &args(json!({"pid": 4_000_000_000u64})))
            .unwrap();
        assert_eq!(record["success"], false);
    }
}
