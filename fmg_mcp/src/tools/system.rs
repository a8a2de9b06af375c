//! System, ADOM, and task tools.
//!
//! Covers the read-only system surface (`/sys/status`, `/sys/ha/status`),
//! ADOM enumeration, workspace-mode locking, and the task endpoints
//! including `wait_for_task`, the blocking poller for asynchronous
//! operations started by install/script/device tools.

use serde_json::{Map, Value, json};
use std::time::Duration;

use fmg_api::{FmgClient, FmgError, WaitOptions};

use super::{
    ParamKind, ParamSpec, ToolSpec, optional_bool, optional_i64, optional_str,
    optional_string_vec, require_adom, require_i64, require_str, success_list, success_message,
    success_with,
};

pub(super) const SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "get_system_status",
        description: "Get FortiManager system status and version information.",
        params: &[],
    },
    ToolSpec {
        name: "get_ha_status",
        description: "Get FortiManager High Availability cluster status.",
        params: &[],
    },
    ToolSpec {
        name: "list_adoms",
        description: "List all Administrative Domains (ADOMs).",
        params: &[ParamSpec {
            name: "fields",
            kind: ParamKind::StringArray,
            description: "Specific fields to return (all when omitted)",
            required: false,
        }],
    },
    ToolSpec {
        name: "get_adom",
        description: "Get detailed information about a specific ADOM.",
        params: &[
            ParamSpec {
                name: "name",
                kind: ParamKind::String,
                description: "ADOM name, e.g. 'root'",
                required: true,
            },
            ParamSpec {
                name: "include_details",
                kind: ParamKind::Boolean,
                description: "Load sub-objects as well (default: false)",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "list_tasks",
        description: "List tasks tracking background operations (installs, script runs, device registration).",
        params: &[ParamSpec {
            name: "filter_state",
            kind: ParamKind::String,
            description: "Only tasks in this state: pending, running, done, error or cancelled",
            required: false,
        }],
    },
    ToolSpec {
        name: "get_task",
        description: "Get the current status of a task by id.",
        params: &[
            ParamSpec {
                name: "task_id",
                kind: ParamKind::Integer,
                description: "Task id",
                required: true,
            },
            ParamSpec {
                name: "include_details",
                kind: ParamKind::Boolean,
                description: "Include per-device task lines (default: false)",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "wait_for_task",
        description: "Block until a task reaches a terminal state (done, error, cancelled) or the timeout elapses. Use after install_package, execute_script or add_device.",
        params: &[
            ParamSpec {
                name: "task_id",
                kind: ParamKind::Integer,
                description: "Task id to monitor",
                required: true,
            },
            ParamSpec {
                name: "timeout",
                kind: ParamKind::Integer,
                description: "Maximum wait in seconds (default: 300)",
                required: false,
            },
            ParamSpec {
                name: "poll_interval",
                kind: ParamKind::Integer,
                description: "Seconds between status checks (default: 5)",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "lock_adom",
        description: "Lock an ADOM for editing (workspace mode).",
        params: &[ParamSpec {
            name: "adom",
            kind: ParamKind::String,
            description: "ADOM name to lock",
            required: true,
        }],
    },
    ToolSpec {
        name: "unlock_adom",
        description: "Unlock an ADOM (workspace mode). Commit first to keep changes.",
        params: &[ParamSpec {
            name: "adom",
            kind: ParamKind::String,
            description: "ADOM name to unlock",
            required: true,
        }],
    },
    ToolSpec {
        name: "commit_adom",
        description: "Commit pending workspace changes in an ADOM.",
        params: &[ParamSpec {
            name: "adom",
            kind: ParamKind::String,
            description: "ADOM name to commit",
            required: true,
        }],
    },
];

pub(super) async fn dispatch(
    client: &FmgClient,
    name: &str,
    args: &Map<String, Value>,
) -> Option<Result<Value, FmgError>> {
    Some(match name {
        "get_system_status" => get_system_status(client).await,
        "get_ha_status" => get_ha_status(client).await,
        "list_adoms" => list_adoms(client, args).await,
        "get_adom" => get_adom(client, args).await,
        "list_tasks" => list_tasks(client, args).await,
        "get_task" => get_task(client, args).await,
        "wait_for_task" => wait_for_task(client, args).await,
        "lock_adom" => lock_adom(client, args).await,
        "unlock_adom" => unlock_adom(client, args).await,
        "commit_adom" => commit_adom(client, args).await,
        _ => return None,
    })
}

async fn get_system_status(client: &FmgClient) -> Result<Value, FmgError> {
    let data = client.get_system_status().await?;
    Ok(success_with("data", data))
}

async fn get_ha_status(client: &FmgClient) -> Result<Value, FmgError> {
    let data = client.get_ha_status().await?;
    Ok(success_with("data", data))
}

async fn list_adoms(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let fields = optional_string_vec(args, "fields")?;
    let adoms = client.list_adoms(fields, None).await?;
    Ok(success_list("adoms", adoms))
}

async fn get_adom(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let name = fmg_api::validation::validate_adom_name(require_str(args, "name")?)?;
    let loadsub = optional_bool(args, "include_details", false) as i64;
    let adom = client.get_adom(&name, loadsub).await?;
    Ok(success_with("adom", adom))
}

async fn list_tasks(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let filter = optional_str(args, "filter_state").map(|state| json!(["state", "==", state]));
    let tasks = client.list_tasks(filter).await?;
    Ok(success_list("tasks", tasks))
}

async fn get_task(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let task_id = require_i64(args, "task_id")?;
    let task = client.get_task(task_id).await?;

    let mut result = success_with("task", task);
    if optional_bool(args, "include_details", false) {
        let lines = client.get_task_lines(task_id).await?;
        result["lines"] = Value::Array(lines);
    }
    Ok(result)
}

/// The poller itself lives in `fmg_api::task`; this wrapper only maps tool
/// arguments onto [`WaitOptions`] and the outcome back onto the wire shape.
async fn wait_for_task(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let task_id = require_i64(args, "task_id")?;
    let timeout = optional_i64(args, "timeout").unwrap_or(300);
    let poll_interval = optional_i64(args, "poll_interval").unwrap_or(5);
    if timeout <= 0 {
        return Err(FmgError::Validation("timeout must be > 0".to_string()));
    }
    if poll_interval <= 0 {
        return Err(FmgError::Validation("poll_interval must be > 0".to_string()));
    }

    let options = WaitOptions {
        timeout: Duration::from_secs(timeout as u64),
        poll_interval: Duration::from_secs(poll_interval as u64),
    };
    let outcome = fmg_api::wait_for_task(client, task_id, options).await?;

    Ok(json!({
        "status": if outcome.success { "success" } else { "error" },
        "completed": outcome.completed,
        "state": outcome.state.map(|s| s.as_str()),
        "task": outcome.task,
        "message": outcome.message,
    }))
}

async fn lock_adom(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    client.lock_adom(&adom).await?;
    Ok(success_message(format!("ADOM '{adom}' locked")))
}

async fn unlock_adom(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    client.unlock_adom(&adom).await?;
    Ok(success_message(format!("ADOM '{adom}' unlocked")))
}

async fn commit_adom(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    client.commit_adom(&adom).await?;
    Ok(success_message(format!("ADOM '{adom}' changes committed")))
}
