//! Policy package and firewall policy tools.
//!
//! Package CRUD goes against `/pm/pkg`, policies against the package's
//! `firewall/policy` table, and installation through the security console
//! exec endpoints. Install operations return a task id; callers follow up
//! with `wait_for_task`.

use serde_json::{Map, Value, json};

use fmg_api::validation::validate_package_name;
use fmg_api::{FmgClient, FmgError};

use super::{
    ParamKind, ParamSpec, ToolSpec, adom_or_root, optional_bool, optional_filter, optional_i64,
    optional_str, optional_string_vec, require_adom, require_i64, require_object,
    require_object_map, require_scope, require_str, success_list, success_message, success_with,
    task_started,
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

const PACKAGE: ParamSpec = ParamSpec {
    name: "package",
    kind: ParamKind::String,
    description: "Policy package name",
    required: true,
};

const POLICY_ID: ParamSpec = ParamSpec {
    name: "policy_id",
    kind: ParamKind::Integer,
    description: "Firewall policy id",
    required: true,
};

const DEVICES: ParamSpec = ParamSpec {
    name: "devices",
    kind: ParamKind::ObjectArray,
    description: "Target devices, e.g. [{\"name\": \"FGT-1\", \"vdom\": \"root\"}]",
    required: true,
};

pub(super) const SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "list_packages",
        description: "List policy packages in an ADOM.",
        params: &[ADOM_DEFAULT],
    },
    ToolSpec {
        name: "get_package",
        description: "Get details of a policy package.",
        params: &[
            ParamSpec {
                name: "name",
                kind: ParamKind::String,
                description: "Package name",
                required: true,
            },
            ADOM_DEFAULT,
            ParamSpec {
                name: "include_details",
                kind: ParamKind::Boolean,
                description: "Load contained policies as well (default: false)",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "create_package",
        description: "Create a new policy package.",
        params: &[
            ADOM_REQUIRED,
            ParamSpec {
                name: "name",
                kind: ParamKind::String,
                description: "Package name",
                required: true,
            },
            ParamSpec {
                name: "package_settings",
                kind: ParamKind::Object,
                description: "Optional package settings (ngfw-mode, inspection-mode, ...)",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "delete_package",
        description: "Delete a policy package.",
        params: &[
            ADOM_REQUIRED,
            ParamSpec {
                name: "name",
                kind: ParamKind::String,
                description: "Package name",
                required: true,
            },
        ],
    },
    ToolSpec {
        name: "clone_package",
        description: "Clone a policy package under a new name.",
        params: &[
            ADOM_REQUIRED,
            PACKAGE,
            ParamSpec {
                name: "new_name",
                kind: ParamKind::String,
                description: "Name for the clone",
                required: true,
            },
        ],
    },
    ToolSpec {
        name: "assign_package",
        description: "Assign a policy package to devices (sets the package scope).",
        params: &[ADOM_REQUIRED, PACKAGE, DEVICES],
    },
    ToolSpec {
        name: "list_firewall_policies",
        description: "List firewall policies in a package. Supports field selection, FortiManager filter expressions and ranged paging.",
        params: &[
            ADOM_REQUIRED,
            PACKAGE,
            ParamSpec {
                name: "fields",
                kind: ParamKind::StringArray,
                description: "Specific fields to return",
                required: false,
            },
            ParamSpec {
                name: "filter",
                kind: ParamKind::Array,
                description: "FortiManager filter expression, e.g. [\"action\", \"==\", \"accept\"]",
                required: false,
            },
            ParamSpec {
                name: "offset",
                kind: ParamKind::Integer,
                description: "Paging offset (requires limit)",
                required: false,
            },
            ParamSpec {
                name: "limit",
                kind: ParamKind::Integer,
                description: "Maximum number of policies to return",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "get_firewall_policy",
        description: "Get one firewall policy by id.",
        params: &[ADOM_REQUIRED, PACKAGE, POLICY_ID],
    },
    ToolSpec {
        name: "get_firewall_policy_count",
        description: "Count firewall policies in a package.",
        params: &[ADOM_REQUIRED, PACKAGE],
    },
    ToolSpec {
        name: "create_firewall_policy",
        description: "Create a firewall policy in a package.",
        params: &[
            ADOM_REQUIRED,
            PACKAGE,
            ParamSpec {
                name: "policy",
                kind: ParamKind::Object,
                description: "Policy body: srcintf, dstintf, srcaddr, dstaddr, service, action, schedule, ...",
                required: true,
            },
        ],
    },
    ToolSpec {
        name: "update_firewall_policy",
        description: "Update fields of a firewall policy.",
        params: &[
            ADOM_REQUIRED,
            PACKAGE,
            POLICY_ID,
            ParamSpec {
                name: "data",
                kind: ParamKind::Object,
                description: "Fields to update",
                required: true,
            },
        ],
    },
    ToolSpec {
        name: "delete_firewall_policy",
        description: "Delete a firewall policy.",
        params: &[ADOM_REQUIRED, PACKAGE, POLICY_ID],
    },
    ToolSpec {
        name: "delete_firewall_policies_bulk",
        description: "Delete multiple firewall policies by id.",
        params: &[
            ADOM_REQUIRED,
            PACKAGE,
            ParamSpec {
                name: "policy_ids",
                kind: ParamKind::Array,
                description: "Policy ids to delete",
                required: true,
            },
        ],
    },
    ToolSpec {
        name: "move_firewall_policy",
        description: "Move a firewall policy before or after another policy.",
        params: &[
            ADOM_REQUIRED,
            PACKAGE,
            POLICY_ID,
            ParamSpec {
                name: "target",
                kind: ParamKind::Integer,
                description: "Policy id to move relative to",
                required: true,
            },
            ParamSpec {
                name: "position",
                kind: ParamKind::String,
                description: "\"before\" or \"after\" (default: before)",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "install_package",
        description: "Install a policy package to devices. Asynchronous: returns a task id to monitor with wait_for_task.",
        params: &[
            ADOM_REQUIRED,
            PACKAGE,
            DEVICES,
            ParamSpec {
                name: "preview",
                kind: ParamKind::Boolean,
                description: "Only generate a preview instead of applying (default: false)",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "install_device_settings",
        description: "Install device-level settings only (interfaces, DNS, NTP) without the policy package. Asynchronous.",
        params: &[ADOM_REQUIRED, DEVICES],
    },
    ToolSpec {
        name: "preview_install",
        description: "Generate an installation preview for devices. Asynchronous; fetch the diff afterwards with get_preview_result.",
        params: &[ADOM_REQUIRED, DEVICES],
    },
    ToolSpec {
        name: "get_preview_result",
        description: "Fetch the diff produced by a completed installation preview.",
        params: &[ADOM_REQUIRED, DEVICES],
    },
];

pub(super) async fn dispatch(
    client: &FmgClient,
    name: &str,
    args: &Map<String, Value>,
) -> Option<Result<Value, FmgError>> {
    Some(match name {
        "list_packages" => list_packages(client, args).await,
        "get_package" => get_package(client, args).await,
        "create_package" => create_package(client, args).await,
        "delete_package" => delete_package(client, args).await,
        "clone_package" => clone_package(client, args).await,
        "assign_package" => assign_package(client, args).await,
        "list_firewall_policies" => list_firewall_policies(client, args).await,
        "get_firewall_policy" => get_firewall_policy(client, args).await,
        "get_firewall_policy_count" => get_firewall_policy_count(client, args).await,
        "create_firewall_policy" => create_firewall_policy(client, args).await,
        "update_firewall_policy" => update_firewall_policy(client, args).await,
        "delete_firewall_policy" => delete_firewall_policy(client, args).await,
        "delete_firewall_policies_bulk" => delete_firewall_policies_bulk(client, args).await,
        "move_firewall_policy" => move_firewall_policy(client, args).await,
        "install_package" => install_package(client, args).await,
        "install_device_settings" => install_device_settings(client, args).await,
        "preview_install" => preview_install(client, args).await,
        "get_preview_result" => get_preview_result(client, args).await,
        _ => return None,
    })
}

async fn list_packages(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let packages = client.list_packages(&adom, None).await?;
    Ok(success_list("packages", packages))
}

async fn get_package(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let name = validate_package_name(require_str(args, "name")?)?;
    let loadsub = optional_bool(args, "include_details", false) as i64;
    let package = client.get_package(&adom, &name, loadsub).await?;
    Ok(success_with("package", package))
}

async fn create_package(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_package_name(require_str(args, "name")?)?;
    let settings = args.get("package_settings").filter(|v| v.is_object()).cloned();
    client.create_package(&adom, &name, settings).await?;
    Ok(success_message(format!("package {name} created in ADOM {adom}")))
}

async fn delete_package(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_package_name(require_str(args, "name")?)?;
    client.delete_package(&adom, &name).await?;
    Ok(success_message(format!("package {name} deleted")))
}

async fn clone_package(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let package = validate_package_name(require_str(args, "package")?)?;
    let new_name = validate_package_name(require_str(args, "new_name")?)?;
    client.clone_package(&adom, &package, &new_name).await?;
    Ok(success_message(format!("package {package} cloned to {new_name}")))
}

async fn assign_package(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let package = validate_package_name(require_str(args, "package")?)?;
    let scope = require_scope(args, "devices")?;
    let count = scope.len();
    client.assign_package(&adom, &package, scope).await?;
    Ok(success_message(format!(
        "package {package} assigned to {count} device(s)"
    )))
}

async fn list_firewall_policies(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let package = validate_package_name(require_str(args, "package")?)?;
    let fields = optional_string_vec(args, "fields")?;
    let filter = optional_filter(args, "filter");
    let range = match (optional_i64(args, "offset"), optional_i64(args, "limit")) {
        (offset, Some(limit)) => Some((offset.unwrap_or(0), limit)),
        (Some(_), None) => {
            return Err(FmgError::Validation(
                "'offset' requires 'limit' to be set".to_string(),
            ));
        }
        (None, None) => None,
    };
    let policies = client
        .list_firewall_policies(&adom, &package, fields, filter, range)
        .await?;
    Ok(success_list("policies", policies))
}

async fn get_firewall_policy(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let package = validate_package_name(require_str(args, "package")?)?;
    let policy_id = require_i64(args, "policy_id")?;
    let policy = client.get_firewall_policy(&adom, &package, policy_id).await?;
    Ok(success_with("policy", policy))
}

async fn get_firewall_policy_count(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let package = validate_package_name(require_str(args, "package")?)?;
    let count = client.get_firewall_policy_count(&adom, &package).await?;
    Ok(json!({"status": "success", "count": count}))
}

async fn create_firewall_policy(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let package = validate_package_name(require_str(args, "package")?)?;
    let policy = require_object(args, "policy")?;
    let result = client.create_firewall_policy(&adom, &package, policy).await?;
    Ok(success_with("policy", result))
}

async fn update_firewall_policy(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let package = validate_package_name(require_str(args, "package")?)?;
    let policy_id = require_i64(args, "policy_id")?;
    let data = require_object_map(args, "data")?;
    let result = client
        .update_firewall_policy(&adom, &package, policy_id, data)
        .await?;
    Ok(success_with("policy", result))
}

async fn delete_firewall_policy(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let package = validate_package_name(require_str(args, "package")?)?;
    let policy_id = require_i64(args, "policy_id")?;
    client.delete_firewall_policy(&adom, &package, policy_id).await?;
    Ok(success_message(format!("policy {policy_id} deleted from {package}")))
}

async fn delete_firewall_policies_bulk(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let package = validate_package_name(require_str(args, "package")?)?;
    let ids = args
        .get("policy_ids")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            FmgError::Validation("missing required parameter 'policy_ids'".to_string())
        })?;
    let mut policy_ids = Vec::with_capacity(ids.len());
    for id in ids {
        policy_ids.push(id.as_i64().ok_or_else(|| {
            FmgError::Validation("'policy_ids' must contain integers".to_string())
        })?);
    }
    if policy_ids.is_empty() {
        return Err(FmgError::Validation("'policy_ids' cannot be empty".to_string()));
    }
    let count = policy_ids.len();
    client
        .delete_firewall_policies(&adom, &package, policy_ids)
        .await?;
    Ok(success_message(format!("{count} policies deleted from {package}")))
}

async fn move_firewall_policy(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let package = validate_package_name(require_str(args, "package")?)?;
    let policy_id = require_i64(args, "policy_id")?;
    let target = require_i64(args, "target")?;
    let position = optional_str(args, "position").unwrap_or("before");
    if position != "before" && position != "after" {
        return Err(FmgError::Validation(
            "position must be 'before' or 'after'".to_string(),
        ));
    }
    client
        .move_firewall_policy(&adom, &package, policy_id, target, position)
        .await?;
    Ok(success_message(format!(
        "policy {policy_id} moved {position} {target}"
    )))
}

async fn install_package(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let package = validate_package_name(require_str(args, "package")?)?;
    let scope = require_scope(args, "devices")?;
    let preview = optional_bool(args, "preview", false);

    let flags = if preview { vec!["preview".to_string()] } else { vec!["none".to_string()] };
    let result = client.install_package(&adom, &package, scope, Some(flags)).await?;

    let mut response = task_started(result, if preview { "installation preview" } else { "installation" });
    response["preview"] = json!(preview);
    Ok(response)
}

async fn install_device_settings(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let scope = require_scope(args, "devices")?;
    let result = client.install_device(&adom, scope, None).await?;
    Ok(task_started(result, "device settings installation"))
}

async fn preview_install(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let scope = require_scope(args, "devices")?;
    let result = client.install_preview(&adom, scope, Some(vec!["json".to_string()])).await?;
    Ok(task_started(result, "installation preview"))
}

async fn get_preview_result(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let scope = require_scope(args, "devices")?;
    let result = client.get_preview_result(&adom, scope).await?;
    Ok(success_with("preview", result))
}
