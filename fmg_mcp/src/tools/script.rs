//! CLI script tools.
//!
//! Script execution targets one of three places: a live device (or a list
//! of them), a device group, or the ADOM database through a policy
//! package. Remote executions return a task id for `wait_for_task`; the
//! log tools then pull per-device output.

use serde_json::{Map, Value, json};

use fmg_api::validation::{validate_device_name, validate_object_name};
use fmg_api::{FmgClient, FmgError};

use super::{
    ParamKind, ParamSpec, ToolSpec, adom_or_root, optional_str, optional_string_vec,
    require_adom, require_i64, require_object_map, require_scope, require_str, success_list,
    success_message, success_with, task_started,
};

const ADOM_DEFAULT: ParamSpec = ParamSpec {
    name: "adom",
    kind: ParamKind::String,
    description: "ADOM name (default: root)",
    required: false,
};

const ADOM_REQUIRED: ParamSpec = ParamSpec {
    name: "adom",
    kind: ParamKind::String,
    description: "ADOM name",
    required: true,
};

const SCRIPT: ParamSpec = ParamSpec {
    name: "script",
    kind: ParamKind::String,
    description: "Script name",
    required: true,
};

const DEVICE_OPTIONAL: ParamSpec = ParamSpec {
    name: "device",
    kind: ParamKind::String,
    description: "Limit to one device by name",
    required: false,
};

pub(super) const SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "list_scripts",
        description: "List CLI scripts in an ADOM.",
        params: &[
            ADOM_DEFAULT,
            ParamSpec {
                name: "fields",
                kind: ParamKind::StringArray,
                description: "Specific fields to return",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "get_script",
        description: "Get a CLI script including its content.",
        params: &[ADOM_REQUIRED, SCRIPT],
    },
    ToolSpec {
        name: "create_script",
        description: "Create a CLI script.",
        params: &[
            ADOM_REQUIRED,
            ParamSpec {
                name: "name",
                kind: ParamKind::String,
                description: "Script name",
                required: true,
            },
            ParamSpec {
                name: "content",
                kind: ParamKind::String,
                description: "Script body (FortiOS CLI commands)",
                required: true,
            },
            ParamSpec {
                name: "script_type",
                kind: ParamKind::String,
                description: "cli, tcl or jinja (default: cli)",
                required: false,
            },
            ParamSpec {
                name: "target",
                kind: ParamKind::String,
                description: "device_database, remote_device or adom_database (default: device_database)",
                required: false,
            },
            ParamSpec {
                name: "description",
                kind: ParamKind::String,
                description: "Script description",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "update_script",
        description: "Update fields of a CLI script.",
        params: &[
            ADOM_REQUIRED,
            SCRIPT,
            ParamSpec {
                name: "data",
                kind: ParamKind::Object,
                description: "Fields to update (content, desc, target, ...)",
                required: true,
            },
        ],
    },
    ToolSpec {
        name: "delete_script",
        description: "Delete a CLI script.",
        params: &[ADOM_REQUIRED, SCRIPT],
    },
    ToolSpec {
        name: "execute_script_on_device",
        description: "Run a CLI script on one device. Asynchronous: returns a task id.",
        params: &[
            ADOM_REQUIRED,
            SCRIPT,
            ParamSpec {
                name: "device",
                kind: ParamKind::String,
                description: "Target device name",
                required: true,
            },
            ParamSpec {
                name: "vdom",
                kind: ParamKind::String,
                description: "Target VDOM (default: global)",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "execute_script_on_devices",
        description: "Run a CLI script on multiple devices. Asynchronous: returns a task id.",
        params: &[
            ADOM_REQUIRED,
            SCRIPT,
            ParamSpec {
                name: "devices",
                kind: ParamKind::ObjectArray,
                description: "Target devices, e.g. [{\"name\": \"FGT-1\", \"vdom\": \"root\"}]",
                required: true,
            },
        ],
    },
    ToolSpec {
        name: "execute_script_on_device_group",
        description: "Run a CLI script on every member of a device group. Asynchronous.",
        params: &[
            ADOM_REQUIRED,
            SCRIPT,
            ParamSpec {
                name: "group",
                kind: ParamKind::String,
                description: "Device group name",
                required: true,
            },
        ],
    },
    ToolSpec {
        name: "execute_script_on_package",
        description: "Run an adom_database script against a policy package. Asynchronous.",
        params: &[
            ADOM_REQUIRED,
            SCRIPT,
            ParamSpec {
                name: "package",
                kind: ParamKind::String,
                description: "Policy package name or OID",
                required: true,
            },
        ],
    },
    ToolSpec {
        name: "get_script_log_latest",
        description: "Get the most recent script execution log.",
        params: &[ADOM_REQUIRED, DEVICE_OPTIONAL],
    },
    ToolSpec {
        name: "get_script_log_summary",
        description: "List script execution log summaries.",
        params: &[ADOM_REQUIRED, DEVICE_OPTIONAL],
    },
    ToolSpec {
        name: "get_script_log_output",
        description: "Get the output of one script execution by log id.",
        params: &[
            ADOM_REQUIRED,
            ParamSpec {
                name: "log_id",
                kind: ParamKind::Integer,
                description: "Log id from the summary listing",
                required: true,
            },
            DEVICE_OPTIONAL,
        ],
    },
];

pub(super) async fn dispatch(
    client: &FmgClient,
    name: &str,
    args: &Map<String, Value>,
) -> Option<Result<Value, FmgError>> {
    Some(match name {
        "list_scripts" => list_scripts(client, args).await,
        "get_script" => get_script(client, args).await,
        "create_script" => create_script(client, args).await,
        "update_script" => update_script(client, args).await,
        "delete_script" => delete_script(client, args).await,
        "execute_script_on_device" => execute_on_device(client, args).await,
        "execute_script_on_devices" => execute_on_devices(client, args).await,
        "execute_script_on_device_group" => execute_on_device_group(client, args).await,
        "execute_script_on_package" => execute_on_package(client, args).await,
        "get_script_log_latest" => get_log_latest(client, args).await,
        "get_script_log_summary" => get_log_summary(client, args).await,
        "get_script_log_output" => get_log_output(client, args).await,
        _ => return None,
    })
}

async fn list_scripts(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let fields = optional_string_vec(args, "fields")?;
    let scripts = client.list_scripts(&adom, fields, None).await?;
    Ok(success_list("scripts", scripts))
}

async fn get_script(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "script")?)?;
    let script = client.get_script(&adom, &name).await?;
    Ok(success_with("script", script))
}

async fn create_script(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let content = require_str(args, "content")?;
    let script_type = optional_str(args, "script_type").unwrap_or("cli");
    let target = optional_str(args, "target").unwrap_or("device_database");

    let mut script = Map::new();
    script.insert("name".to_string(), json!(name));
    script.insert("content".to_string(), json!(content));
    script.insert("type".to_string(), json!(script_type));
    script.insert("target".to_string(), json!(target));
    if let Some(desc) = optional_str(args, "description") {
        script.insert("desc".to_string(), json!(desc));
    }

    client.create_script(&adom, Value::Object(script)).await?;
    Ok(success_message(format!("script {name} created")))
}

async fn update_script(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "script")?)?;
    let data = require_object_map(args, "data")?;
    client.update_script(&adom, &name, data).await?;
    Ok(success_message(format!("script {name} updated")))
}

async fn delete_script(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "script")?)?;
    client.delete_script(&adom, &name).await?;
    Ok(success_message(format!("script {name} deleted")))
}

async fn execute_on_device(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let script = validate_object_name(require_str(args, "script")?)?;
    let device = validate_device_name(require_str(args, "device")?)?;
    let vdom = optional_str(args, "vdom").unwrap_or("global");

    let scope = vec![json!({"name": device, "vdom": vdom})];
    let result = client.execute_script(&adom, &script, Some(scope), None).await?;
    Ok(task_started(result, "script execution"))
}

async fn execute_on_devices(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let script = validate_object_name(require_str(args, "script")?)?;
    let scope = require_scope(args, "devices")?;
    let result = client.execute_script(&adom, &script, Some(scope), None).await?;
    Ok(task_started(result, "script execution"))
}

async fn execute_on_device_group(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let script = validate_object_name(require_str(args, "script")?)?;
    let group = validate_object_name(require_str(args, "group")?)?;

    // A scope entry without a vdom addresses a device group.
    let scope = vec![json!({"name": group})];
    let result = client.execute_script(&adom, &script, Some(scope), None).await?;
    Ok(task_started(result, "script execution"))
}

async fn execute_on_package(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let script = validate_object_name(require_str(args, "script")?)?;
    let package = require_str(args, "package")?;
    let result = client
        .execute_script(&adom, &script, None, Some(json!(package)))
        .await?;
    Ok(task_started(result, "script execution"))
}

async fn get_log_latest(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let device = match optional_str(args, "device") {
        Some(device) => Some(validate_device_name(device)?),
        None => None,
    };
    let log = client.get_script_log_latest(&adom, device.as_deref()).await?;
    Ok(success_with("log", log))
}

async fn get_log_summary(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let device = match optional_str(args, "device") {
        Some(device) => Some(validate_device_name(device)?),
        None => None,
    };
    let logs = client.get_script_log_summary(&adom, device.as_deref()).await?;
    Ok(success_list("logs", logs))
}

async fn get_log_output(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let log_id = require_i64(args, "log_id")?;
    let device = match optional_str(args, "device") {
        Some(device) => Some(validate_device_name(device)?),
        None => None,
    };
    let output = client
        .get_script_log_output(&adom, log_id, device.as_deref())
        .await?;
    Ok(success_with("output", output))
}
