//! SD-WAN template (wanprof) tools.

use serde_json::{Map, Value, json};

use fmg_api::validation::validate_object_name;
use fmg_api::{FmgClient, FmgError};

use super::{
    ParamKind, ParamSpec, ToolSpec, adom_or_root, optional_str, optional_string_vec,
    require_adom, require_scope, require_str, success_list, success_message, success_with,
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
    description: "SD-WAN template name",
    required: true,
};

const TEMPLATE: ParamSpec = ParamSpec {
    name: "template",
    kind: ParamKind::String,
    description: "SD-WAN template name",
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
        name: "list_sdwan_templates",
        description: "List SD-WAN templates in an ADOM.",
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
        name: "get_sdwan_template",
        description: "Get one SD-WAN template.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "create_sdwan_template",
        description: "Create an SD-WAN template.",
        params: &[
            ADOM_REQUIRED,
            NAME,
            ParamSpec {
                name: "description",
                kind: ParamKind::String,
                description: "Template description",
                required: false,
            },
        ],
    },
    ToolSpec {
        name: "delete_sdwan_template",
        description: "Delete an SD-WAN template.",
        params: &[ADOM_REQUIRED, NAME],
    },
    ToolSpec {
        name: "assign_sdwan_template",
        description: "Assign an SD-WAN template to devices.",
        params: &[ADOM_REQUIRED, TEMPLATE, DEVICES],
    },
    ToolSpec {
        name: "unassign_sdwan_template",
        description: "Remove devices from an SD-WAN template's scope.",
        params: &[ADOM_REQUIRED, TEMPLATE, DEVICES],
    },
];

pub(super) async fn dispatch(
    client: &FmgClient,
    name: &str,
    args: &Map<String, Value>,
) -> Option<Result<Value, FmgError>> {
    Some(match name {
        "list_sdwan_templates" => list_templates(client, args).await,
        "get_sdwan_template" => get_template(client, args).await,
        "create_sdwan_template" => create_template(client, args).await,
        "delete_sdwan_template" => delete_template(client, args).await,
        "assign_sdwan_template" => assign_template(client, args).await,
        "unassign_sdwan_template" => unassign_template(client, args).await,
        _ => return None,
    })
}

async fn list_templates(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = adom_or_root(args)?;
    let fields = optional_string_vec(args, "fields")?;
    let templates = client.list_sdwan_templates(&adom, fields).await?;
    Ok(success_list("templates", templates))
}

async fn get_template(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    let template = client.get_sdwan_template(&adom, &name).await?;
    Ok(success_with("template", template))
}

async fn create_template(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;

    let mut template = Map::new();
    template.insert("name".to_string(), json!(name));
    if let Some(desc) = optional_str(args, "description") {
        template.insert("description".to_string(), json!(desc));
    }

    client.create_sdwan_template(&adom, Value::Object(template)).await?;
    Ok(success_message(format!("SD-WAN template {name} created")))
}

async fn delete_template(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let name = validate_object_name(require_str(args, "name")?)?;
    client.delete_sdwan_template(&adom, &name).await?;
    Ok(success_message(format!("SD-WAN template {name} deleted")))
}

async fn assign_template(client: &FmgClient, args: &Map<String, Value>) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let template = validate_object_name(require_str(args, "template")?)?;
    let scope = require_scope(args, "devices")?;
    let count = scope.len();
    client.assign_sdwan_template(&adom, &template, scope).await?;
    Ok(success_message(format!(
        "SD-WAN template {template} assigned to {count} device(s)"
    )))
}

async fn unassign_template(
    client: &FmgClient,
    args: &Map<String, Value>,
) -> Result<Value, FmgError> {
    let adom = require_adom(args)?;
    let template = validate_object_name(require_str(args, "template")?)?;
    let scope = require_scope(args, "devices")?;
    let count = scope.len();
    client.unassign_sdwan_template(&adom, &template, scope).await?;
    Ok(success_message(format!(
        "SD-WAN template {template} unassigned from {count} device(s)"
    )))
}
