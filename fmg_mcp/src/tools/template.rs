//! Provisioning template tools.
//!
//! Covers the plain provisioning templates (`/pm/template`), system
//! templates (`/pm/devprof`), CLI template groups (config objects), and
//! template groups (`/pm/tmplgrp`). Validation runs through the security
//! console and returns a task id.

use serde_json::{Map, Value, json};

use fmg_api::validation::validate_object_name;
use fmg_api::{FmgClient, FmgError};

use super::{
    ParamKind, ParamSpec, ToolSpec, adom_or_root, optional_string_vec, require_adom,
    require_scope, require_str, success_list, success_message, success_with, task_started,
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

const NAME: ParamSpec = ParamSpec {
    name: "name",
    kind: ParamKind::String,
    description: "Template name",
    required: true,
};

const TEMPLATE: ParamSpec = ParamSpec {
    name: "template",
    kind: ParamKind::String,
    description: "Template name",
    required: true,
};

const FIELDS: ParamSpec = ParamSpec {
    name: "fields",
    kind: ParamKind::StringArray,
    description: "Specific fields to return",
    required: false,
};

const DEVICES: ParamSpec = ParamSpec {
    name: "devices",
    kind: ParamKind::ObjectArray,
    description: "Target devices, e.g. [{\"name\": \"FGT-1\", \"vdom\": \"root\"}]",
    required: true,
};

pub(super) const SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: "list_templates",
        description: "List provisioning templates in an ADOM.",
        params: &[ADOM_DEFAULT, FIELDS],
    },
    ToolSpec {
        name: "get_template",
        description: "Get one provisioning template.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "list_system_templates",
        description: "List system templates (device profiles) in an ADOM.",
        params: &[ADOM_DEFAULT, FIELDS],
    },
    ToolSpec {
        name: "get_system_template",
        description: "Get one system template.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "assign_system_template",
        description: "Assign a system template to devices.",
        params: &[ADOM_REQUIRED, TEMPLATE, DEVICES],
    },
    ToolSpec {
        name: "unassign_system_template",
        description: "Remove devices from a system template's scope.",
        params: &[ADOM_REQUIRED, TEMPLATE, DEVICES],
    },
    ToolSpec {
        name: "list_cli_template_groups",
        description: "List CLI template groups in an ADOM.",
        params: &[ADOM_DEFAULT, FIELDS],
    },
    ToolSpec {
        name: "get_cli_template_group",
        description: "Get one CLI template group.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "create_cli_template_group",
        description: "Create a CLI template group from existing CLI templates.",
        params: &[
            ADOM_REQUIRED,
            NAME,
            ParamSpec {
                name: "members",
                kind: ParamKind::StringArray,
                description: "CLI template names forming the group",
                required: true,
            },
            ParamSpec {
                name: "description",
                kind: ParamKind::String,
                description: "Group description",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "delete_cli_template_group",
        description: "Delete a CLI template group.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "list_template_groups",
        description: "List template groups in an ADOM.",
        params: &[ADOM_DEFAULT, FIELDS],
    },
    ToolSpec {
        name: "get_template_group",
        description: "Get one template group.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "assign_template_group",
        description: "Assign a template group to devices.",
        params: &[
            ADOM_REQUIRED,
            ParamSpec {
                name: "group",
                kind: ParamKind::String,
                description: "Template group name",
                required: true,
            },
            DEVICES,
        ],
    },
    ToolSpec {
        name: "validate_template",
        description: "Validate a template group against devices. Asynchronous: returns a task id.",
        params: &[
            ADOM_REQUIRED,
            ParamSpec {
                name: "template_path",
                kind: ParamKind::String,
                description: "Template path, e.g. \"adom/demo/tmplgrp/branch-group\"",
                required: true,
            },
            DEVICES,
        ],
    },
];

pub(super) async fn dispatch(
    client: &FmgClient,
    name: &str,
    args: &Map<String, Value>,
) -> Option<Result<Value, FmgError>> {
    Some(match name {
        "list_templates" => list_templates(client, args).await,
        "get_template" => get_template(client, args).await,
        "list_system_templates" => list_system_templates(client, args).await,
        "get_system_template" => get_system_template(client, args).await,
        "assign_system_template" => assign_system_template(client, args).await,
        "unassign_system_template" => unassign_system_template(client, args).await,
        "list_cli_template_groups" => list_cli_template_groups(client, args).await,
        "get_cli_template_group" => get_cli_template_group(client, args).await,
        "create_cli_template_group" => create_cli_template_group(client, args).await,
        "delete_cli_template_group" => delete_cli_template_group(client, args).await,
        "list_template_groups" => list_template_groups(client, args).await,
        "get_template_group" => get_template_group(client, args).await,
        "assign_template_group" => assign_template_group(client, args).await,
        "validate_template" => validate_template(client, args).await,
        _ => return None,
    })
}

async fn list_templates(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let fields = optional_string_vec(args, "fields")?;
    let templates = client.list_templates(&adom, fields).await?;
    Ok(success_list("templates", templates))
}

async fn get_template(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let template = client.get_template(&adom, &name).await?;
    Ok(success_with("template", template))
}

async fn list_system_templates(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let fields = optional_string_vec(args, "fields")?;
    let templates = client.list_system_templates(&adom, fields).await?;
    Ok(success_list("templates", templates))
}

async fn get_system_template(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let template = client.get_system_template(&adom, &name).await?;
    Ok(success_with("template", template))
}

async fn assign_system_template(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let template = validate_object_name(require_str(args, "template")?)?;
    let scope = require_scope(args, "devices")?;
    let count = scope.len();
    client.assign_system_template(&adom, &template, scope).await?;
    Ok(success_message(format!(
        "system template {template} assigned to {count} device(s)"
    )))
}

async fn unassign_system_template(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let template = validate_object_name(require_str(args, "template")?)?;
    let scope = require_scope(args, "devices")?;
    let count = scope.len();
    client.unassign_system_template(&adom, &template, scope).await?;
    Ok(success_message(format!(
        "system template {template} unassigned from {count} device(s)"
    )))
}

async fn list_cli_template_groups(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let fields = optional_string_vec(args, "fields")?;
    let groups = client.list_cli_template_groups(&adom, fields).await?;
    Ok(success_list("groups", groups))
}

async fn get_cli_template_group(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let group = client.get_cli_template_group(&adom, &name).await?;
    Ok(success_with("group", group))
}

async fn create_cli_template_group(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let members = optional_string_vec(args, "members")?.ok_or_else(|| {
        FmgError::Validation("missing required parameter 'members'".to_string())
    })?;

    let mut group = Map::new();
    group.insert("name".to_string(), json!(name));
    group.insert("member".to_string(), json!(members));
    if let Some(desc) = super::optional_str(args, "description") {
        group.insert("description".to_string(), json!(desc));
    }

    client.create_cli_template_group(&adom, Value::Object(group)).await?;
    Ok(success_message(format!("CLI template group {name} created")))
}

async fn delete_cli_template_group(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    client.delete_cli_template_group(&adom, &name).await?;
    Ok(success_message(format!("CLI template group {name} deleted")))
}

async fn list_template_groups(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let fields = optional_string_vec(args, "fields")?;
    let groups = client.list_template_groups(&adom, fields).await?;
    Ok(success_list("groups", groups))
}

async fn get_template_group(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let group = client.get_template_group(&adom, &name).await?;
    Ok(success_with("group", group))
}

async fn assign_template_group(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let group = validate_object_name(require_str(args, "group")?)?;
    let scope = require_scope(args, "devices")?;
    let count = scope.len();
    client.assign_template_group(&adom, &group, scope).await?;
    Ok(success_message(format!(
        "template group {group} assigned to {count} device(s)"
    )))
}

async fn validate_template(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let template_path = require_str(args, "template_path")?;
    let scope = require_scope(args, "devices")?;
    let result = client.validate_template(&adom, template_path, scope).await?;
    Ok(task_started(result, "template validation"))
}
