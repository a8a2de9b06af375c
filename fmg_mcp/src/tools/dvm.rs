//! Device manager tools.
//!
//! Read access goes against the DVMDB tables; add/delete go through the
//! `/dvm/cmd` exec endpoints, which run asynchronously on the appliance
//! and hand back a task id.

use serde_json::{Map, Value, json};

use fmg_api::validation::{validate_device_name, validate_device_serial, validate_ipv4};
use fmg_api::{FmgClient, FmgError};

use super::{
    ParamKind, ParamSpec, ToolSpec, adom_or_root, optional_bool, optional_str,
    optional_string_vec, require_adom, require_object_map, require_scope, require_str,
    success_list, success_message, success_with,
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

const FIELDS: ParamSpec = ParamSpec {
    name: "fields",
    kind: ParamKind::StringArray,
    description: "Specific fields to return (all when omitted)",
    required: false,
};

pub(super) const SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "list_devices",
        description: "List managed devices in an ADOM.",
        params: &[ADOM_DEFAULT, FIELDS],
    },
    ToolSpec {
        name: "get_device",
        description: "Get detailed information about a managed device.",
        params: &[
            ParamSpec {
                name: "name",
                kind: ParamKind::String,
                description: "Device name",
                required: true,
            },
            ADOM_DEFAULT,
            ParamSpec {
                name: "include_details",
                kind: ParamKind::Boolean,
                description: "Load sub-objects such as VDOMs (default: false)",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "list_device_vdoms",
        description: "List VDOMs configured on a managed device.",
        params: &[
            ParamSpec {
                name: "device",
                kind: ParamKind::String,
                description: "Device name",
                required: true,
            },
            ADOM_DEFAULT,
        ],
    },
    ToolSpec {
        name: "list_device_groups",
        description: "List device groups in an ADOM.",
        params: &[ADOM_DEFAULT],
    },
    ToolSpec {
        name: "get_device_status",
        description: "Get connection and configuration sync status for devices.",
        params: &[
            ADOM_DEFAULT,
            ParamSpec {
                name: "device",
                kind: ParamKind::String,
                description: "Limit to one device by name",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "search_devices",
        description: "Search devices by name substring.",
        params: &[
            ParamSpec {
                name: "query",
                kind: ParamKind::String,
                description: "Substring to match against device names",
                required: true,
            },
            ADOM_DEFAULT,
        ],
    },
    ToolSpec {
        name: "add_device",
        description: "Register a device with FortiManager. Provide an IP for a live device or a serial number for offline provisioning. Asynchronous on the appliance side.",
        params: &[
            ADOM_REQUIRED,
            ParamSpec {
                name: "name",
                kind: ParamKind::String,
                description: "Device display name",
                required: true,
            },
            ParamSpec {
                name: "ip",
                kind: ParamKind::String,
                description: "Device IP address (live device)",
                required: false,
            },
            ParamSpec {
                name: "serial_number",
                kind: ParamKind::String,
                description: "Device serial number (model device)",
                required: false,
            },
            ParamSpec {
                name: "admin_user",
                kind: ParamKind::String,
                description: "Admin username for the device connection",
                required: false,
            },
            ParamSpec {
                name: "admin_pass",
                kind: ParamKind::String,
                description: "Admin password for the device connection",
                required: false,
            },
            ParamSpec {
                name: "description",
                kind: ParamKind::String,
                description: "Device description",
                required: false,
            },
            ParamSpec {
                name: "mgmt_mode",
                kind: ParamKind::String,
                description: "Management mode: fmg or fmgfaz (default: fmg)",
                required: false,
            },
            ParamSpec {
                name: "flags",
                kind: ParamKind::StringArray,
                description: "Additional flags, e.g. [\"create_task\"]",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "add_model_device",
        description: "Add a model device for zero-touch provisioning: policies can be prepared before the hardware first connects.",
        params: &[
            ADOM_REQUIRED,
            ParamSpec {
                name: "name",
                kind: ParamKind::String,
                description: "Device display name",
                required: true,
            },
            ParamSpec {
                name: "serial_number",
                kind: ParamKind::String,
                description: "Device serial number, e.g. FGVM02TM12345678",
                required: true,
            },
            ParamSpec {
                name: "platform",
                kind: ParamKind::String,
                description: "Platform string (default: FortiGate-VM64)",
                required: false,
            },
            ParamSpec {
                name: "os_version",
                kind: ParamKind::String,
                description: "FortiOS version (default: 7.0)",
                required: false,
            },
            ParamSpec {
                name: "description",
                kind: ParamKind::String,
                description: "Device description",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "delete_device",
        description: "Remove a device from FortiManager.",
        params: &[
            ADOM_REQUIRED,
            ParamSpec {
                name: "device",
                kind: ParamKind::String,
                description: "Device name to delete",
                required: true,
            },
            ParamSpec {
                name: "flags",
                kind: ParamKind::StringArray,
                description: "Additional flags",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "add_devices_bulk",
        description: "Register multiple devices in one call.",
        params: &[
            ADOM_REQUIRED,
            ParamSpec {
                name: "devices",
                kind: ParamKind::ObjectArray,
                description: "Device configuration objects (name, ip, sn, ...)",
                required: true,
            },
            ParamSpec {
                name: "flags",
                kind: ParamKind::StringArray,
                description: "Additional flags",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "delete_devices_bulk",
        description: "Remove multiple devices in one call.",
        params: &[
            ADOM_REQUIRED,
            ParamSpec {
                name: "devices",
                kind: ParamKind::ObjectArray,
                description: "Device references, e.g. [{\"name\": \"FGT-1\"}]",
                required: true,
            },
            ParamSpec {
                name: "flags",
                kind: ParamKind::StringArray,
                description: "Additional flags",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "update_device",
        description: "Update properties of a managed device (description, meta fields, ...).",
        params: &[
            ADOM_REQUIRED,
            ParamSpec {
                name: "device",
                kind: ParamKind::String,
                description: "Device name",
                required: true,
            },
            ParamSpec {
                name: "data",
                kind: ParamKind::Object,
                description: "Fields to update",
                required: true,
            },
        ],
    },
    ToolSpec {
        name: "reload_device_list",
        description: "Reload the device list from managed devices.",
        params: &[ADOM_DEFAULT],
    },
];

pub(super) async fn dispatch(
    client: &FmgClient,
    name: &str,
    args: &Map<String, Value>,
) -> Option<Result<Value, FmgError>> {
    Some(match name {
        "list_devices" => list_devices(client, args).await,
        "get_device" => get_device(client, args).await,
        "list_device_vdoms" => list_device_vdoms(client, args).await,
        "list_device_groups" => list_device_groups(client, args).await,
        "get_device_status" => get_device_status(client, args).await,
        "search_devices" => search_devices(client, args).await,
        "add_device" => add_device(client, args).await,
        "add_model_device" => add_model_device(client, args).await,
        "delete_device" => delete_device(client, args).await,
        "add_devices_bulk" => add_devices_bulk(client, args).await,
        "delete_devices_bulk" => delete_devices_bulk(client, args).await,
        "update_device" => update_device(client, args).await,
        "reload_device_list" => reload_device_list(client, args).await,
        _ => return None,
    })
}

async fn list_devices(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let fields = optional_string_vec(args, "fields")?;
    let devices = client.list_devices(&adom, fields, None).await?;
    Ok(success_list("devices", devices))
}

async fn get_device(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let name = validate_device_name(require_str(args, "name")?)?;
    let loadsub = optional_bool(args, "include_details", false) as i64;
    let device = client.get_device(&adom, &name, loadsub).await?;
    Ok(success_with("device", device))
}

async fn list_device_vdoms(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let device = validate_device_name(require_str(args, "device")?)?;
    let vdoms = client.list_device_vdoms(&adom, &device).await?;
    Ok(success_list("vdoms", vdoms))
}

async fn list_device_groups(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let groups = client.list_device_groups(&adom).await?;
    Ok(success_list("groups", groups))
}

async fn get_device_status(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let device = match optional_str(args, "device") {
        Some(device) => Some(validate_device_name(device)?),
        None => None,
    };
    let devices = client.get_device_status(&adom, device.as_deref()).await?;
    Ok(success_list("devices", devices))
}

async fn search_devices(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let query = require_str(args, "query")?;
    let filter = json!(["name", "like", format!("%{query}%")]);
    let devices = client.list_devices(&adom, None, Some(filter)).await?;
    Ok(success_list("devices", devices))
}

async fn add_device(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_device_name(require_str(args, "name")?)?;

    let mut device = Map::new();
    device.insert("name".to_string(), json!(name));
    device.insert(
        "mgmt_mode".to_string(),
        json!(optional_str(args, "mgmt_mode").unwrap_or("fmg")),
    );

    if let Some(ip) = optional_str(args, "ip") {
        device.insert("ip".to_string(), json!(validate_ipv4(ip)?));
        if let Some(user) = optional_str(args, "admin_user") {
            device.insert("adm_usr".to_string(), json!(user));
        }
        if let Some(pass) = optional_str(args, "admin_pass") {
            device.insert("adm_pass".to_string(), json!(pass));
        }
    }
    if let Some(serial) = optional_str(args, "serial_number") {
        device.insert("sn".to_string(), json!(validate_device_serial(serial)?));
        if !device.contains_key("ip") {
            device.insert("device action".to_string(), json!("add_model"));
        }
    }
    if !device.contains_key("ip") && !device.contains_key("sn") {
        return Err(FmgError::Validation(
            "either 'ip' or 'serial_number' is required".to_string(),
        ));
    }
    if let Some(desc) = optional_str(args, "description") {
        device.insert("desc".to_string(), json!(desc));
    }

    let flags = optional_string_vec(args, "flags")?;
    let result = client.add_device(&adom, Value::Object(device), flags).await?;

    let task_id = result.get("taskid").cloned().unwrap_or(Value::Null);
    Ok(json!({
        "status": "success",
        "device": result.get("device"),
        "task_id": task_id,
        "message": format!("device {name} added"),
    }))
}

async fn add_model_device(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_device_name(require_str(args, "name")?)?;
    let serial = validate_device_serial(require_str(args, "serial_number")?)?;

    let mut device = Map::new();
    device.insert("name".to_string(), json!(name));
    device.insert("sn".to_string(), json!(serial));
    device.insert(
        "platform_str".to_string(),
        json!(optional_str(args, "platform").unwrap_or("FortiGate-VM64")),
    );
    device.insert(
        "os_ver".to_string(),
        json!(optional_str(args, "os_version").unwrap_or("7.0")),
    );
    device.insert("mgmt_mode".to_string(), json!("fmg"));
    device.insert("device action".to_string(), json!("add_model"));
    if let Some(desc) = optional_str(args, "description") {
        device.insert("desc".to_string(), json!(desc));
    }

    let result = client.add_device(&adom, Value::Object(device), None).await?;
    Ok(json!({
        "status": "success",
        "device": result.get("device"),
        "message": format!("model device {name} added"),
    }))
}

async fn delete_device(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let device = validate_device_name(require_str(args, "device")?)?;
    let flags = optional_string_vec(args, "flags")?;
    client.delete_device(&adom, &device, flags).await?;
    Ok(success_message(format!("device {device} deleted")))
}

async fn add_devices_bulk(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let devices = require_scope(args, "devices")?;
    let flags = optional_string_vec(args, "flags")?;
    let count = devices.len();
    let result = client.add_device_list(&adom, devices, flags).await?;
    Ok(json!({
        "status": "success",
        "result": result,
        "message": format!("bulk add of {count} devices submitted"),
    }))
}

async fn delete_devices_bulk(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let devices = require_scope(args, "devices")?;
    let flags = optional_string_vec(args, "flags")?;
    let count = devices.len();
    client.delete_device_list(&adom, devices, flags).await?;
    Ok(success_message(format!("bulk delete of {count} devices submitted")))
}

async fn update_device(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let device = validate_device_name(require_str(args, "device")?)?;
    let data = require_object_map(args, "data")?;
    let result = client.update_device(&adom, &device, data).await?;
    Ok(success_with("device", result))
}

async fn reload_device_list(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    client.reload_device_list(&adom).await?;
    Ok(success_message(format!("device list reload started for ADOM {adom}")))
}
